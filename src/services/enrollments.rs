//! Enrollment ledger.
//!
//! Creating an enrollment consumes one seat of its program and deleting it
//! returns the seat. Both happen in the same transaction as the row change,
//! and the seat counter moves through a single guarded UPDATE so two
//! concurrent attempts can never both take the last seat. Installment
//! enrollments get their payment schedule in that same transaction.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::parties::require_active_user;
use super::programs::installment_schedule;
use super::retry::{with_retry, RetryConfig};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::catalogs::{AcademicStatus, InstallmentStatus, PaymentModality, PaymentStatus};
use crate::models::{academic_program, enrollment, income, installment, payment_plan, student};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub student_id: i32,
    pub program_id: i32,
    pub modality: PaymentModality,
    pub payment_plan_id: Option<i32>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub coordinator_id: Option<i32>,
    pub notes: Option<String>,
    /// Due date of the first installment. Defaults to the program's planned
    /// start, or the enrollment day when the program has none.
    #[serde(default)]
    pub first_due_date: Option<NaiveDate>,
}

impl NewEnrollment {
    /// Standing preconditions: consistent amounts and modality/plan pairing.
    pub fn check(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            ("total_amount", self.total_amount),
            ("discount_amount", self.discount_amount),
            ("final_amount", self.final_amount),
        ] {
            if value < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "{} must not be negative, got {}",
                    field, value
                )));
            }
        }

        if self.final_amount != self.total_amount - self.discount_amount {
            return Err(ServiceError::ValidationError(format!(
                "final amount {} must equal total {} minus discount {}",
                self.final_amount, self.total_amount, self.discount_amount
            )));
        }

        match (self.modality.requires_plan(), self.payment_plan_id) {
            (true, None) => Err(ServiceError::ValidationError(
                "installment enrollments require a payment plan".into(),
            )),
            (false, Some(plan_id)) => Err(ServiceError::ValidationError(format!(
                "cash enrollments cannot reference payment plan {}",
                plan_id
            ))),
            _ => Ok(()),
        }
    }
}

/// Consistent amounts for enrolling in a program under a modality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentQuote {
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Prices an enrollment from the program: cash payments get the cash
/// discount, installment payments get the promotion when it applies.
/// `extra_discount` is an absolute amount granted on top.
pub fn quote_enrollment(
    program: &academic_program::Model,
    modality: PaymentModality,
    extra_discount: Decimal,
    today: NaiveDate,
) -> Result<EnrollmentQuote, ServiceError> {
    if extra_discount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "extra discount must not be negative".into(),
        ));
    }

    let total = program.base_cost;
    let priced = match modality {
        PaymentModality::Cash => program.cash_price(),
        PaymentModality::Installments => program.promotion_price(today).unwrap_or(total),
    };
    let discount = (total - priced) + extra_discount;
    if discount > total {
        return Err(ServiceError::ValidationError(format!(
            "discount {} exceeds program cost {}",
            discount, total
        )));
    }

    Ok(EnrollmentQuote {
        total_amount: total,
        discount_amount: discount,
        final_amount: total - discount,
    })
}

/// Outcome of an overdue sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueSweep {
    /// Installments moved from Pending to Overdue
    pub installments: u64,
    /// Enrollments whose payment status became Overdue
    pub enrollments: u64,
}

/// Moves Pending installments due strictly before `as_of` to Overdue,
/// optionally for a single enrollment.
async fn flag_past_due<C: ConnectionTrait>(
    conn: &C,
    as_of: NaiveDate,
    enrollment_id: Option<i32>,
) -> Result<u64, ServiceError> {
    let mut update = installment::Entity::update_many()
        .col_expr(
            installment::Column::Status,
            Expr::value(InstallmentStatus::Overdue),
        )
        .col_expr(installment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(installment::Column::Status.eq(InstallmentStatus::Pending))
        .filter(installment::Column::DueDate.lt(as_of));
    if let Some(id) = enrollment_id {
        update = update.filter(installment::Column::EnrollmentId.eq(id));
    }
    Ok(update.exec(conn).await?.rows_affected)
}

#[derive(Clone)]
pub struct EnrollmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    retry: RetryConfig,
}

impl EnrollmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, retry: RetryConfig) -> Self {
        Self {
            db,
            event_sender,
            retry,
        }
    }

    /// Creates an enrollment and takes one seat, atomically. Installment
    /// enrollments also get their schedule.
    ///
    /// Fails with `DuplicateError` when the student is already enrolled in the
    /// program and with `CapacityError` when no seat is left. An attempt that
    /// loses a write race to a concurrent enrollment is replayed, so the
    /// loser sees the seat count the winner left behind.
    #[instrument(skip(self, input), fields(student_id = input.student_id, program_id = input.program_id))]
    pub async fn create_enrollment(
        &self,
        input: NewEnrollment,
    ) -> Result<enrollment::Model, ServiceError> {
        input.check()?;

        let (created, seats_left, scheduled) = with_retry(&self.retry, "create_enrollment", || {
            self.try_create_enrollment(&input)
        })
        .await?;

        counter!("campus_ledger.enrollments.created", 1);
        info!(
            enrollment_id = created.id,
            seats_left, scheduled, "Enrollment created"
        );

        self.event_sender
            .publish(Event::EnrollmentCreated {
                enrollment_id: created.id,
                student_id: created.student_id,
                program_id: created.program_id,
                seats_left,
            })
            .await;

        Ok(created)
    }

    async fn try_create_enrollment(
        &self,
        input: &NewEnrollment,
    ) -> Result<(enrollment::Model, i32, usize), ServiceError> {
        let txn = self.db.begin().await?;

        let student = student::Entity::find_by_id(input.student_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ReferenceError(format!("student {} does not exist", input.student_id))
            })?;
        if !student.active {
            return Err(ServiceError::ValidationError(format!(
                "student {} is deactivated",
                student.id
            )));
        }

        let program = academic_program::Entity::find_by_id(input.program_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ReferenceError(format!("program {} does not exist", input.program_id))
            })?;
        if !program.status.accepts_enrollments() {
            return Err(ServiceError::ValidationError(format!(
                "program {} is {} and no longer takes enrollments",
                program.code, program.status
            )));
        }

        let plan = match input.payment_plan_id {
            Some(plan_id) => {
                let plan = payment_plan::Entity::find_by_id(plan_id)
                    .one(&txn)
                    .await?
                    .filter(|plan| plan.program_id == program.id)
                    .ok_or_else(|| {
                        ServiceError::ReferenceError(format!(
                            "payment plan {} does not belong to program {}",
                            plan_id, program.code
                        ))
                    })?;
                if !plan.active {
                    return Err(ServiceError::ValidationError(format!(
                        "payment plan {} is inactive",
                        plan.name
                    )));
                }
                Some(plan)
            }
            None => None,
        };

        if let Some(coordinator_id) = input.coordinator_id {
            require_active_user(&txn, coordinator_id).await?;
        }

        let already_enrolled = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student.id))
            .filter(enrollment::Column::ProgramId.eq(program.id))
            .count(&txn)
            .await?;
        if already_enrolled > 0 {
            warn!("Rejected duplicate enrollment");
            return Err(ServiceError::DuplicateError(format!(
                "student {} is already enrolled in program {}",
                student.id, program.code
            )));
        }

        let now = Utc::now();
        let taken = academic_program::Entity::update_many()
            .col_expr(
                academic_program::Column::AvailableSeats,
                Expr::col(academic_program::Column::AvailableSeats).sub(1),
            )
            .col_expr(academic_program::Column::UpdatedAt, Expr::value(now))
            .filter(academic_program::Column::Id.eq(program.id))
            .filter(academic_program::Column::AvailableSeats.gt(0))
            .exec(&txn)
            .await?;
        if taken.rows_affected == 0 {
            warn!("Rejected enrollment: program is full");
            return Err(ServiceError::CapacityError(format!(
                "program {} has no available seats",
                program.code
            )));
        }

        let created = enrollment::ActiveModel {
            student_id: Set(student.id),
            program_id: Set(program.id),
            modality: Set(input.modality),
            payment_plan_id: Set(input.payment_plan_id),
            total_amount: Set(input.total_amount),
            discount_amount: Set(input.discount_amount),
            final_amount: Set(input.final_amount),
            paid_amount: Set(Decimal::ZERO),
            payment_status: Set(PaymentStatus::Pending),
            academic_status: Set(AcademicStatus::PreEnrolled),
            coordinator_id: Set(input.coordinator_id),
            notes: Set(input.notes.clone()),
            version: Set(1),
            enrolled_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut scheduled = 0;
        if let Some(plan) = plan {
            let first_due = input
                .first_due_date
                .or(program.planned_start)
                .unwrap_or_else(|| now.date_naive());
            let rows: Vec<installment::ActiveModel> =
                installment_schedule(&plan, created.final_amount, first_due)?
                    .into_iter()
                    .map(|due| installment::ActiveModel {
                        enrollment_id: Set(created.id),
                        number: Set(due.number),
                        amount: Set(due.amount),
                        due_date: Set(due.due_date),
                        status: Set(InstallmentStatus::Pending),
                        paid_on: Set(None),
                        income_id: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .collect();
            scheduled = rows.len();
            installment::Entity::insert_many(rows).exec(&txn).await?;
        }

        let seats_left = academic_program::Entity::find_by_id(program.id)
            .one(&txn)
            .await?
            .map(|p| p.available_seats)
            .unwrap_or_default();

        txn.commit().await?;
        Ok((created, seats_left, scheduled))
    }

    /// Deletes an enrollment and returns its seat to the program.
    ///
    /// Enrollments with recorded income are kept: financial facts stay
    /// resolvable, so removal is refused with `ReferenceError`.
    #[instrument(skip(self))]
    pub async fn delete_enrollment(&self, enrollment_id: i32) -> Result<(), ServiceError> {
        let program_id = with_retry(&self.retry, "delete_enrollment", || {
            self.try_delete_enrollment(enrollment_id)
        })
        .await?;

        counter!("campus_ledger.enrollments.removed", 1);
        info!(enrollment_id, program_id, "Enrollment removed");

        self.event_sender
            .publish(Event::EnrollmentRemoved {
                enrollment_id,
                program_id,
            })
            .await;
        Ok(())
    }

    async fn try_delete_enrollment(&self, enrollment_id: i32) -> Result<i32, ServiceError> {
        let txn = self.db.begin().await?;

        let found = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("enrollment {}", enrollment_id)))?;

        let incomes = income::Entity::find()
            .filter(income::Column::EnrollmentId.eq(enrollment_id))
            .count(&txn)
            .await?;
        if incomes > 0 {
            return Err(ServiceError::ReferenceError(format!(
                "enrollment {} has {} recorded income(s)",
                enrollment_id, incomes
            )));
        }

        installment::Entity::delete_many()
            .filter(installment::Column::EnrollmentId.eq(enrollment_id))
            .exec(&txn)
            .await?;
        enrollment::Entity::delete_by_id(enrollment_id)
            .exec(&txn)
            .await?;

        let returned = academic_program::Entity::update_many()
            .col_expr(
                academic_program::Column::AvailableSeats,
                Expr::col(academic_program::Column::AvailableSeats).add(1),
            )
            .col_expr(academic_program::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(academic_program::Column::Id.eq(found.program_id))
            .filter(
                Expr::col(academic_program::Column::AvailableSeats)
                    .lt(Expr::col(academic_program::Column::TotalSeats)),
            )
            .exec(&txn)
            .await?;
        if returned.rows_affected == 0 {
            return Err(ServiceError::ConsistencyError(format!(
                "program {} already has every seat available",
                found.program_id
            )));
        }

        txn.commit().await?;
        Ok(found.program_id)
    }

    pub async fn get_enrollment(&self, enrollment_id: i32) -> Result<enrollment::Model, ServiceError> {
        enrollment::Entity::find_by_id(enrollment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("enrollment {}", enrollment_id)))
    }

    pub async fn enrollments_for_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<enrollment::Model>, ServiceError> {
        Ok(enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .order_by_asc(enrollment::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Payment schedule of an enrollment, first installment first.
    pub async fn installments_for(
        &self,
        enrollment_id: i32,
    ) -> Result<Vec<installment::Model>, ServiceError> {
        Ok(installment::Entity::find()
            .filter(installment::Column::EnrollmentId.eq(enrollment_id))
            .order_by_asc(installment::Column::Number)
            .all(&*self.db)
            .await?)
    }

    /// Academic progress is driven by an external workflow. Concluded and
    /// Withdrawn are final. Withdrawing cancels the installments still owed.
    #[instrument(skip(self))]
    pub async fn update_academic_status(
        &self,
        enrollment_id: i32,
        status: AcademicStatus,
    ) -> Result<enrollment::Model, ServiceError> {
        let (updated, cancelled) = with_retry(&self.retry, "update_academic_status", || {
            self.try_update_academic_status(enrollment_id, status)
        })
        .await?;
        info!(enrollment_id, status = %status, cancelled, "Academic status changed");
        Ok(updated)
    }

    async fn try_update_academic_status(
        &self,
        enrollment_id: i32,
        status: AcademicStatus,
    ) -> Result<(enrollment::Model, u64), ServiceError> {
        let txn = self.db.begin().await?;

        let found = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("enrollment {}", enrollment_id)))?;
        if found.academic_status == status {
            return Ok((found, 0));
        }
        if found.academic_status.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "enrollment {} is {} and cannot move to {}",
                enrollment_id, found.academic_status, status
            )));
        }

        let mut active: enrollment::ActiveModel = found.into();
        active.academic_status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        let mut cancelled = 0;
        if status == AcademicStatus::Withdrawn {
            cancelled = installment::Entity::update_many()
                .col_expr(
                    installment::Column::Status,
                    Expr::value(InstallmentStatus::Cancelled),
                )
                .col_expr(installment::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(installment::Column::EnrollmentId.eq(enrollment_id))
                .filter(
                    installment::Column::Status
                        .is_in([InstallmentStatus::Pending, InstallmentStatus::Overdue]),
                )
                .exec(&txn)
                .await?
                .rows_affected;
        }

        txn.commit().await?;
        Ok((updated, cancelled))
    }

    /// Sweeps every schedule for installments past due on `as_of` and flags
    /// the unpaid enrollments that owe them as Overdue.
    ///
    /// Enrollments already Overdue or fully paid are left alone. An income
    /// recomputes the status from the amounts, and the next sweep flags the
    /// enrollment again while an overdue installment is still open.
    #[instrument(skip(self))]
    pub async fn refresh_overdue(&self, as_of: NaiveDate) -> Result<OverdueSweep, ServiceError> {
        let sweep = with_retry(&self.retry, "refresh_overdue", || self.try_refresh_overdue(as_of))
            .await?;

        counter!("campus_ledger.installments.overdue", sweep.installments);
        info!(
            %as_of,
            installments = sweep.installments,
            enrollments = sweep.enrollments,
            "Overdue sweep finished"
        );

        self.event_sender
            .publish(Event::OverdueDetected {
                as_of,
                installments: sweep.installments,
                enrollments: sweep.enrollments,
            })
            .await;
        Ok(sweep)
    }

    async fn try_refresh_overdue(&self, as_of: NaiveDate) -> Result<OverdueSweep, ServiceError> {
        let txn = self.db.begin().await?;

        let installments = flag_past_due(&txn, as_of, None).await?;

        let owing: BTreeSet<i32> = installment::Entity::find()
            .filter(installment::Column::Status.eq(InstallmentStatus::Overdue))
            .all(&txn)
            .await?
            .into_iter()
            .map(|due| due.enrollment_id)
            .collect();

        let enrollments = if owing.is_empty() {
            0
        } else {
            enrollment::Entity::update_many()
                .col_expr(
                    enrollment::Column::PaymentStatus,
                    Expr::value(PaymentStatus::Overdue),
                )
                .col_expr(
                    enrollment::Column::Version,
                    Expr::col(enrollment::Column::Version).add(1),
                )
                .col_expr(enrollment::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(enrollment::Column::Id.is_in(owing))
                .filter(
                    enrollment::Column::PaymentStatus
                        .is_in([PaymentStatus::Pending, PaymentStatus::Partial]),
                )
                .exec(&txn)
                .await?
                .rows_affected
        };

        txn.commit().await?;
        Ok(OverdueSweep {
            installments,
            enrollments,
        })
    }

    /// Flags one unpaid enrollment as overdue for the collection workflow.
    ///
    /// Its Pending installments due before `as_of` become Overdue. Fails
    /// with `ValidationError` when the enrollment is fully paid or owes
    /// nothing past due on `as_of`.
    #[instrument(skip(self))]
    pub async fn mark_overdue(
        &self,
        enrollment_id: i32,
        as_of: NaiveDate,
    ) -> Result<enrollment::Model, ServiceError> {
        let updated = with_retry(&self.retry, "mark_overdue", || {
            self.try_mark_overdue(enrollment_id, as_of)
        })
        .await?;
        info!(enrollment_id, %as_of, "Enrollment marked overdue");
        Ok(updated)
    }

    async fn try_mark_overdue(
        &self,
        enrollment_id: i32,
        as_of: NaiveDate,
    ) -> Result<enrollment::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let found = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("enrollment {}", enrollment_id)))?;
        if found.is_fully_paid() {
            return Err(ServiceError::ValidationError(format!(
                "enrollment {} is fully paid",
                enrollment_id
            )));
        }

        flag_past_due(&txn, as_of, Some(enrollment_id)).await?;
        let overdue = installment::Entity::find()
            .filter(installment::Column::EnrollmentId.eq(enrollment_id))
            .filter(installment::Column::Status.eq(InstallmentStatus::Overdue))
            .count(&txn)
            .await?;
        if overdue == 0 {
            return Err(ServiceError::ValidationError(format!(
                "enrollment {} has no installment past due on {}",
                enrollment_id, as_of
            )));
        }

        let updated = enrollment::Entity::update_many()
            .col_expr(
                enrollment::Column::PaymentStatus,
                Expr::value(PaymentStatus::Overdue),
            )
            .col_expr(enrollment::Column::Version, Expr::value(found.version + 1))
            .col_expr(enrollment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(enrollment::Column::Id.eq(enrollment_id))
            .filter(enrollment::Column::Version.eq(found.version))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification {
                entity: "enrollment",
                id: enrollment_id,
            });
        }

        let flagged = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("enrollment {}", enrollment_id)))?;
        txn.commit().await?;
        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalogs::ProgramStatus;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn input(modality: PaymentModality, plan: Option<i32>) -> NewEnrollment {
        NewEnrollment {
            student_id: 1,
            program_id: 1,
            modality,
            payment_plan_id: plan,
            total_amount: dec!(1000),
            discount_amount: dec!(100),
            final_amount: dec!(900),
            coordinator_id: None,
            notes: None,
            first_due_date: None,
        }
    }

    fn program() -> academic_program::Model {
        let now = Utc::now();
        academic_program::Model {
            id: 1,
            code: "DIP-DATA".into(),
            name: "Diploma in Data Analysis".into(),
            description: None,
            duration_weeks: None,
            total_hours: None,
            base_cost: dec!(2000),
            cash_discount_pct: dec!(10),
            total_seats: 20,
            available_seats: 20,
            status: ProgramStatus::Planned,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            tutor_id: None,
            promotion_active: true,
            promotion_description: None,
            promotion_discount_pct: dec!(5),
            promotion_deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn consistent_input_passes() {
        assert!(input(PaymentModality::Cash, None).check().is_ok());
        assert!(input(PaymentModality::Installments, Some(3)).check().is_ok());
    }

    #[test]
    fn final_must_equal_total_minus_discount() {
        let mut bad = input(PaymentModality::Cash, None);
        bad.final_amount = dec!(950);
        assert_matches!(bad.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn modality_plan_pairing_is_enforced() {
        assert_matches!(
            input(PaymentModality::Installments, None).check(),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            input(PaymentModality::Cash, Some(3)).check(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut bad = input(PaymentModality::Cash, None);
        bad.total_amount = dec!(-100);
        bad.discount_amount = dec!(-1000);
        bad.final_amount = dec!(900);
        assert_matches!(bad.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn quotes_follow_modality() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let cash = quote_enrollment(&program(), PaymentModality::Cash, dec!(0), today).unwrap();
        assert_eq!(cash.discount_amount, dec!(200));
        assert_eq!(cash.final_amount, dec!(1800));

        let financed =
            quote_enrollment(&program(), PaymentModality::Installments, dec!(50), today).unwrap();
        assert_eq!(financed.discount_amount, dec!(150));
        assert_eq!(financed.final_amount, dec!(1850));
        assert_eq!(
            financed.final_amount,
            financed.total_amount - financed.discount_amount
        );
    }

    #[test]
    fn quote_rejects_discount_above_cost() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert_matches!(
            quote_enrollment(&program(), PaymentModality::Cash, dec!(5000), today),
            Err(ServiceError::ValidationError(_))
        );
    }
}
