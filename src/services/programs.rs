//! Program catalog: academic programs, their payment plans and pricing.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::validation::{non_negative_decimal, not_blank, percentage};
use crate::errors::ServiceError;
use crate::models::catalogs::ProgramStatus;
use crate::models::{academic_program, enrollment, instructor, payment_plan};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProgram {
    #[validate(length(max = 20), custom = "not_blank")]
    pub code: String,
    #[validate(length(max = 200), custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    #[validate(range(min = 1))]
    pub total_hours: Option<i32>,
    #[validate(custom = "non_negative_decimal")]
    pub base_cost: Decimal,
    #[validate(custom = "percentage")]
    pub cash_discount_pct: Decimal,
    #[validate(range(min = 0))]
    pub total_seats: i32,
    /// Defaults to `total_seats`
    pub available_seats: Option<i32>,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub tutor_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Promotion {
    #[validate(length(max = 200), custom = "not_blank")]
    pub description: String,
    #[validate(custom = "percentage")]
    pub discount_pct: Decimal,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPaymentPlan {
    pub program_id: i32,
    #[validate(length(max = 100), custom = "not_blank")]
    pub name: String,
    #[validate(range(min = 1))]
    pub installment_count: i32,
    #[validate(range(min = 1))]
    pub interval_days: i32,
    pub description: Option<String>,
}

/// One scheduled payment of an installment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub number: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Splits `final_amount` over the plan's installments.
///
/// Every installment is the cent-rounded even share except the last, which
/// absorbs the rounding remainder so the schedule sums to `final_amount`.
pub fn installment_schedule(
    plan: &payment_plan::Model,
    final_amount: Decimal,
    first_due: NaiveDate,
) -> Result<Vec<Installment>, ServiceError> {
    if plan.installment_count <= 0 || plan.interval_days <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "payment plan {} has no usable schedule",
            plan.id
        )));
    }
    if final_amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "cannot schedule a negative amount".into(),
        ));
    }

    let count = Decimal::from(plan.installment_count);
    let share = (final_amount / count).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let last = final_amount - share * Decimal::from(plan.installment_count - 1);

    Ok((0..plan.installment_count)
        .map(|i| Installment {
            number: i + 1,
            due_date: first_due + Duration::days(i64::from(i) * i64::from(plan.interval_days)),
            amount: if i + 1 == plan.installment_count {
                last
            } else {
                share
            },
        })
        .collect())
}

#[derive(Clone)]
pub struct ProgramService {
    db: Arc<DatabaseConnection>,
}

impl ProgramService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_program(
        &self,
        input: NewProgram,
    ) -> Result<academic_program::Model, ServiceError> {
        input.validate()?;
        let available = input.available_seats.unwrap_or(input.total_seats);
        if available < 0 || available > input.total_seats {
            return Err(ServiceError::ValidationError(format!(
                "available seats {} must be within 0..={}",
                available, input.total_seats
            )));
        }
        if let (Some(start), Some(end)) = (input.planned_start, input.planned_end) {
            if end < start {
                return Err(ServiceError::ValidationError(
                    "program end date precedes its planned start".into(),
                ));
            }
        }

        let db = &*self.db;
        if let Some(tutor_id) = input.tutor_id {
            if instructor::Entity::find_by_id(tutor_id).one(db).await?.is_none() {
                return Err(ServiceError::ReferenceError(format!(
                    "tutor {} does not exist",
                    tutor_id
                )));
            }
        }

        let code = input.code.trim().to_uppercase();
        let existing = academic_program::Entity::find()
            .filter(academic_program::Column::Code.eq(code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!("Rejected duplicate program code");
            return Err(ServiceError::DuplicateError(format!(
                "program code {} already exists",
                code
            )));
        }

        let created = academic_program::ActiveModel {
            code: Set(code),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            duration_weeks: Set(input.duration_weeks),
            total_hours: Set(input.total_hours),
            base_cost: Set(input.base_cost),
            cash_discount_pct: Set(input.cash_discount_pct),
            total_seats: Set(input.total_seats),
            available_seats: Set(available),
            status: Set(ProgramStatus::Planned),
            planned_start: Set(input.planned_start),
            planned_end: Set(input.planned_end),
            actual_start: Set(None),
            actual_end: Set(None),
            tutor_id: Set(input.tutor_id),
            promotion_active: Set(false),
            promotion_description: Set(None),
            promotion_discount_pct: Set(Decimal::ZERO),
            promotion_deadline: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(program_id = created.id, seats = created.total_seats, "Program created");
        Ok(created)
    }

    pub async fn get_program(&self, program_id: i32) -> Result<academic_program::Model, ServiceError> {
        academic_program::Entity::find_by_id(program_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("program {}", program_id)))
    }

    /// Administrative status change. Concluded and Cancelled are final.
    #[instrument(skip(self))]
    pub async fn update_program_status(
        &self,
        program_id: i32,
        status: ProgramStatus,
    ) -> Result<academic_program::Model, ServiceError> {
        let program = self.get_program(program_id).await?;
        if program.status == status {
            return Ok(program);
        }
        if program.status.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "program {} is {} and cannot move to {}",
                program_id, program.status, status
            )));
        }

        let today = Utc::now().date_naive();
        let previous = program.status;
        let mut active: academic_program::ActiveModel = program.clone().into();
        active.status = Set(status);
        match status {
            ProgramStatus::Started if program.actual_start.is_none() => {
                active.actual_start = Set(Some(today));
            }
            ProgramStatus::Concluded => {
                active.actual_end = Set(Some(today));
            }
            _ => {}
        }
        let updated = active.update(&*self.db).await?;

        info!(program_id, from = %previous, to = %status, "Program status changed");
        Ok(updated)
    }

    #[instrument(skip(self, promotion))]
    pub async fn set_promotion(
        &self,
        program_id: i32,
        promotion: Promotion,
    ) -> Result<academic_program::Model, ServiceError> {
        promotion.validate()?;
        let program = self.get_program(program_id).await?;

        let mut active: academic_program::ActiveModel = program.into();
        active.promotion_active = Set(true);
        active.promotion_description = Set(Some(promotion.description));
        active.promotion_discount_pct = Set(promotion.discount_pct);
        active.promotion_deadline = Set(promotion.deadline);
        let updated = active.update(&*self.db).await?;

        info!(program_id, discount_pct = %updated.promotion_discount_pct, "Promotion set");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn clear_promotion(
        &self,
        program_id: i32,
    ) -> Result<academic_program::Model, ServiceError> {
        let program = self.get_program(program_id).await?;

        let mut active: academic_program::ActiveModel = program.into();
        active.promotion_active = Set(false);
        active.promotion_description = Set(None);
        active.promotion_discount_pct = Set(Decimal::ZERO);
        active.promotion_deadline = Set(None);
        Ok(active.update(&*self.db).await?)
    }

    /// Removes a program that nobody enrolled in. Its payment plans cascade.
    #[instrument(skip(self))]
    pub async fn delete_program(&self, program_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;
        let program = self.get_program(program_id).await?;

        let enrolled = enrollment::Entity::find()
            .filter(enrollment::Column::ProgramId.eq(program_id))
            .count(db)
            .await?;
        if enrolled > 0 {
            return Err(ServiceError::ReferenceError(format!(
                "program {} still has {} enrollment(s)",
                program.code, enrolled
            )));
        }

        academic_program::Entity::delete_by_id(program_id)
            .exec(db)
            .await?;
        info!(program_id, "Program deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(program_id = input.program_id, name = %input.name))]
    pub async fn create_payment_plan(
        &self,
        input: NewPaymentPlan,
    ) -> Result<payment_plan::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        if academic_program::Entity::find_by_id(input.program_id)
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::ReferenceError(format!(
                "program {} does not exist",
                input.program_id
            )));
        }

        let name = input.name.trim().to_string();
        let existing = payment_plan::Entity::find()
            .filter(payment_plan::Column::ProgramId.eq(input.program_id))
            .filter(payment_plan::Column::Name.eq(name.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::DuplicateError(format!(
                "program {} already has a plan named {}",
                input.program_id, name
            )));
        }

        let created = payment_plan::ActiveModel {
            program_id: Set(input.program_id),
            name: Set(name),
            installment_count: Set(input.installment_count),
            interval_days: Set(input.interval_days),
            description: Set(input.description),
            active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(plan_id = created.id, "Payment plan created");
        Ok(created)
    }

    pub async fn plans_for(&self, program_id: i32) -> Result<Vec<payment_plan::Model>, ServiceError> {
        Ok(payment_plan::Entity::find()
            .filter(payment_plan::Column::ProgramId.eq(program_id))
            .order_by_asc(payment_plan::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_plan(&self, plan_id: i32) -> Result<payment_plan::Model, ServiceError> {
        payment_plan::Entity::find_by_id(plan_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment plan {}", plan_id)))
    }
}
