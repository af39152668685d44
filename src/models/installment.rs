use super::catalogs::InstallmentStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// One scheduled payment of an installment enrollment, generated from the
/// payment plan when the enrollment is created.
///
/// `amount` and `due_date` are fixed at generation. `status`, `paid_on` and
/// `income_id` follow the incomes recorded against the installment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub enrollment_id: i32,
    pub number: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_on: Option<NaiveDate>,
    pub income_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::Id",
        on_delete = "Cascade"
    )]
    Enrollment,
    #[sea_orm(
        belongs_to = "super::income::Entity",
        from = "Column::IncomeId",
        to = "super::income::Column::Id"
    )]
    Income,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}

impl Model {
    /// Open and due strictly before `as_of`.
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.status.is_open() && as_of > self.due_date
    }

    /// Whole days past the due date; zero when settled or not yet due.
    pub fn days_overdue(&self, as_of: NaiveDate) -> i64 {
        if self.is_past_due(as_of) {
            (as_of - self.due_date).num_days()
        } else {
            0
        }
    }

    /// Negative once the due date has passed.
    pub fn days_until_due(&self, as_of: NaiveDate) -> i64 {
        (self.due_date - as_of).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn installment(status: InstallmentStatus) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            enrollment_id: 1,
            number: 2,
            amount: dec!(250),
            due_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            status,
            paid_on: None,
            income_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn due_date_itself_is_not_late() {
        let pending = installment(InstallmentStatus::Pending);
        let due = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert!(!pending.is_past_due(due));
        assert_eq!(pending.days_overdue(due), 0);
        assert_eq!(pending.days_until_due(due), 0);
    }

    #[test]
    fn open_installments_accrue_days_overdue() {
        let as_of = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap();
        assert_eq!(installment(InstallmentStatus::Pending).days_overdue(as_of), 10);
        assert_eq!(installment(InstallmentStatus::Overdue).days_overdue(as_of), 10);
        assert_eq!(installment(InstallmentStatus::Paid).days_overdue(as_of), 0);
        assert_eq!(installment(InstallmentStatus::Cancelled).days_overdue(as_of), 0);
        assert_eq!(installment(InstallmentStatus::Paid).days_until_due(as_of), -10);
    }
}
