use super::catalogs::ProgramStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_programs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub duration_weeks: Option<i32>,
    pub total_hours: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub base_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub cash_discount_pct: Decimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: ProgramStatus,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub tutor_id: Option<i32>,
    pub promotion_active: bool,
    pub promotion_description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub promotion_discount_pct: Decimal,
    pub promotion_deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::instructor::Entity",
        from = "Column::TutorId",
        to = "super::instructor::Column::Id"
    )]
    Tutor,
    #[sea_orm(has_many = "super::payment_plan::Entity")]
    PaymentPlans,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::instructor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tutor.def()
    }
}

impl Related<super::payment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentPlans.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
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

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn apply_discount(amount: Decimal, pct: Decimal) -> Decimal {
    round_cents(amount * (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED)
}

impl Model {
    pub fn occupied_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    /// Share of seats taken, as a percentage with two decimals.
    pub fn occupancy_percent(&self) -> Decimal {
        if self.total_seats <= 0 {
            return Decimal::ZERO;
        }
        round_cents(
            Decimal::from(self.occupied_seats()) * Decimal::ONE_HUNDRED
                / Decimal::from(self.total_seats),
        )
    }

    /// Base cost after the single-payment discount.
    pub fn cash_price(&self) -> Decimal {
        apply_discount(self.base_cost, self.cash_discount_pct)
    }

    /// Whether the promotion applies on `today`.
    pub fn promotion_applies(&self, today: NaiveDate) -> bool {
        self.promotion_active
            && self
                .promotion_deadline
                .map_or(true, |deadline| today <= deadline)
    }

    /// Base cost after the promotional discount, when the promotion applies.
    pub fn promotion_price(&self, today: NaiveDate) -> Option<Decimal> {
        self.promotion_applies(today)
            .then(|| apply_discount(self.base_cost, self.promotion_discount_pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn program() -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            code: "MBA-01".into(),
            name: "Master in Business Administration".into(),
            description: None,
            duration_weeks: Some(48),
            total_hours: Some(600),
            base_cost: dec!(12500),
            cash_discount_pct: dec!(10),
            total_seats: 30,
            available_seats: 21,
            status: ProgramStatus::Planned,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            tutor_id: None,
            promotion_active: true,
            promotion_description: Some("Early bird".into()),
            promotion_discount_pct: dec!(15),
            promotion_deadline: NaiveDate::from_ymd_opt(2025, 3, 31),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn occupancy_counts_taken_seats() {
        assert_eq!(program().occupancy_percent(), dec!(30));
    }

    #[test]
    fn occupancy_of_seatless_program_is_zero() {
        let mut p = program();
        p.total_seats = 0;
        p.available_seats = 0;
        assert_eq!(p.occupancy_percent(), Decimal::ZERO);
    }

    #[test]
    fn cash_price_applies_discount() {
        assert_eq!(program().cash_price(), dec!(11250));
    }

    #[test]
    fn promotion_respects_deadline() {
        let p = program();
        let before = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(p.promotion_price(before), Some(dec!(10625)));
        assert_eq!(p.promotion_price(after), None);
    }
}
