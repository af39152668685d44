use super::catalogs::{AcademicDegree, IdIssuancePlace};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instructors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub document_number: String,
    pub issuance_place: IdIssuancePlace,
    pub first_names: String,
    pub last_names: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub academic_degree: Option<AcademicDegree>,
    pub specialty: Option<String>,
    pub cv_path: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hourly_fee: Decimal,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::academic_program::Entity")]
    TutoredPrograms,
}

impl Related<super::academic_program::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TutoredPrograms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Display name prefixed with the highest degree, e.g. "PhD. Ana Rojas".
    pub fn display_name(&self) -> String {
        match self.academic_degree {
            Some(degree) => format!("{} {} {}", degree, self.first_names, self.last_names),
            None => format!("{} {}", self.first_names, self.last_names),
        }
    }
}
