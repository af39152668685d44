use super::catalogs::{CashOrigin, MovementType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Mirror entry written by the ledger for every income, expense and
/// reversal. At most one per (origin_type, origin_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub movement_type: MovementType,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub movement_date: NaiveDate,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub origin_type: Option<CashOrigin>,
    pub origin_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Amount with sign: positive for inflows, negative for outflows.
    pub fn signed_amount(&self) -> Decimal {
        match self.movement_type {
            MovementType::Inflow => self.amount,
            MovementType::Outflow => -self.amount,
        }
    }
}
