//! Financial event propagation.
//!
//! Incomes and expenses are append-only facts. Recording one persists the
//! event, updates the aggregates that depend on it and mirrors it into the
//! cash movement ledger inside a single transaction. Corrections never edit
//! posted amounts: voiding an income writes a compensating movement plus an
//! audit entry.
//!
//! Every posting is one transaction, replayed through the shared retry
//! policy when it loses a write race.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::audit::{append_entry, NewAuditEntry};
use super::parties::require_active_user;
use super::retry::{with_retry, RetryConfig};
use super::validation::{ensure_positive_amount, not_blank};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::catalogs::{
    AuditAction, CashOrigin, IncomeType, InstallmentStatus, MovementType, OriginType,
    PaymentMethod, PaymentStatus, TransactionStatus,
};
use crate::models::{cash_movement, enrollment, expense, income, installment};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewIncome {
    pub income_type: IncomeType,
    pub enrollment_id: Option<i32>,
    #[validate(range(min = 1))]
    pub installment_number: Option<i32>,
    pub income_date: NaiveDate,
    pub amount: Decimal,
    #[validate(length(max = 200), custom = "not_blank")]
    pub concept: String,
    pub description: Option<String>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 50), custom = "not_blank")]
    pub receipt_number: String,
    #[validate(length(max = 100))]
    pub transaction_reference: Option<String>,
    pub recorded_by: i32,
}

impl NewIncome {
    fn check(&self) -> Result<(), ServiceError> {
        ensure_positive_amount(self.amount, "income amount")?;
        self.validate()?;
        if let Some(number) = self.installment_number {
            if self.income_type != IncomeType::Installment {
                return Err(ServiceError::ValidationError(format!(
                    "{} income cannot settle installment {}",
                    self.income_type, number
                )));
            }
        }
        match (self.income_type.requires_enrollment(), self.enrollment_id) {
            (true, None) => Err(ServiceError::ValidationError(format!(
                "{} income requires an enrollment",
                self.income_type
            ))),
            (false, Some(id)) => Err(ServiceError::ValidationError(format!(
                "{} income cannot reference enrollment {}",
                self.income_type, id
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewExpense {
    pub expense_date: NaiveDate,
    pub amount: Decimal,
    #[validate(length(max = 50), custom = "not_blank")]
    pub category: String,
    #[validate(length(max = 100))]
    pub subcategory: Option<String>,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(length(max = 50))]
    pub supplier_invoice_number: Option<String>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,
    pub recorded_by: i32,
}

impl NewExpense {
    fn check(&self) -> Result<(), ServiceError> {
        ensure_positive_amount(self.amount, "expense amount")?;
        self.validate()?;
        Ok(())
    }
}

/// Writes the new paid amount and its derived status, conditioned on the
/// version the caller read. A stale version means another posting won.
async fn apply_paid_amount<C: ConnectionTrait>(
    conn: &C,
    current: &enrollment::Model,
    paid: Decimal,
) -> Result<PaymentStatus, ServiceError> {
    let status = PaymentStatus::from_amounts(paid, current.final_amount);
    let result = enrollment::Entity::update_many()
        .col_expr(enrollment::Column::PaidAmount, Expr::value(paid))
        .col_expr(enrollment::Column::PaymentStatus, Expr::value(status))
        .col_expr(enrollment::Column::Version, Expr::value(current.version + 1))
        .col_expr(enrollment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(enrollment::Column::Id.eq(current.id))
        .filter(enrollment::Column::Version.eq(current.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification {
            entity: "enrollment",
            id: current.id,
        });
    }
    Ok(status)
}

/// The open installment an income settles. Its amount must match exactly.
async fn open_installment<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: i32,
    number: i32,
    amount: Decimal,
) -> Result<installment::Model, ServiceError> {
    let due = installment::Entity::find()
        .filter(installment::Column::EnrollmentId.eq(enrollment_id))
        .filter(installment::Column::Number.eq(number))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ReferenceError(format!(
                "enrollment {} has no installment {}",
                enrollment_id, number
            ))
        })?;
    if !due.status.is_open() {
        return Err(ServiceError::ValidationError(format!(
            "installment {} of enrollment {} is {}",
            number, enrollment_id, due.status
        )));
    }
    if due.amount != amount {
        return Err(ServiceError::ConsistencyError(format!(
            "installment {} of enrollment {} is {}, not {}",
            number, enrollment_id, due.amount, amount
        )));
    }
    Ok(due)
}

/// Marks open installments of an enrollment Paid by `income`, either the
/// one numbered installment or, with `None`, every one still open.
async fn settle_installments<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: i32,
    income: &income::Model,
    only: Option<&installment::Model>,
) -> Result<u64, ServiceError> {
    let mut update = installment::Entity::update_many()
        .col_expr(installment::Column::Status, Expr::value(InstallmentStatus::Paid))
        .col_expr(installment::Column::PaidOn, Expr::value(income.income_date))
        .col_expr(installment::Column::IncomeId, Expr::value(income.id))
        .col_expr(installment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(installment::Column::EnrollmentId.eq(enrollment_id))
        .filter(
            installment::Column::Status
                .is_in([InstallmentStatus::Pending, InstallmentStatus::Overdue]),
        );
    if let Some(due) = only {
        update = update.filter(installment::Column::Id.eq(due.id));
    }
    let settled = update.exec(conn).await?.rows_affected;
    if let (Some(due), 0) = (only, settled) {
        return Err(ServiceError::ConcurrentModification {
            entity: "installment",
            id: due.id,
        });
    }
    Ok(settled)
}

/// Puts the installments settled by a voided income back in the schedule:
/// Overdue when their due date is before `today`, Pending otherwise.
async fn reopen_installments<C: ConnectionTrait>(
    conn: &C,
    income_id: i32,
    today: NaiveDate,
) -> Result<u64, ServiceError> {
    let mut reopened = 0;
    for (status, past_due) in [
        (InstallmentStatus::Overdue, true),
        (InstallmentStatus::Pending, false),
    ] {
        let due_filter = if past_due {
            installment::Column::DueDate.lt(today)
        } else {
            installment::Column::DueDate.gte(today)
        };
        reopened += installment::Entity::update_many()
            .col_expr(installment::Column::Status, Expr::value(status))
            .col_expr(installment::Column::PaidOn, Expr::value(Option::<NaiveDate>::None))
            .col_expr(installment::Column::IncomeId, Expr::value(Option::<i32>::None))
            .col_expr(installment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(installment::Column::IncomeId.eq(income_id))
            .filter(due_filter)
            .exec(conn)
            .await?
            .rows_affected;
    }
    Ok(reopened)
}

async fn mirror_cash<C: ConnectionTrait>(
    conn: &C,
    origin: CashOrigin,
    origin_id: i32,
    amount: Decimal,
    movement_date: NaiveDate,
    description: String,
) -> Result<cash_movement::Model, ServiceError> {
    let movement = cash_movement::ActiveModel {
        movement_type: Set(origin.movement_type()),
        amount: Set(amount),
        movement_date: Set(movement_date),
        description: Set(description),
        origin_type: Set(Some(origin)),
        origin_id: Set(Some(origin_id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(movement)
}

async fn load_enrollment<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: i32,
) -> Result<enrollment::Model, ServiceError> {
    enrollment::Entity::find_by_id(enrollment_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ReferenceError(format!("enrollment {} does not exist", enrollment_id))
        })
}

#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    retry: RetryConfig,
}

impl LedgerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, retry: RetryConfig) -> Self {
        Self {
            db,
            event_sender,
            retry,
        }
    }

    /// Records an income and propagates it: the enrollment's paid amount and
    /// payment status move with it and one inflow movement mirrors it.
    ///
    /// An income that would take `paid` above `final` is rejected with
    /// `ConsistencyError` and nothing is persisted. A numbered installment
    /// income settles that installment and must match its amount; an income
    /// that pays the enrollment off settles whatever is still open.
    #[instrument(skip(self, input), fields(income_type = %input.income_type, enrollment_id = ?input.enrollment_id, amount = %input.amount))]
    pub async fn record_income(&self, input: NewIncome) -> Result<income::Model, ServiceError> {
        input.check()?;

        let (created, movement) =
            with_retry(&self.retry, "record_income", || self.try_record_income(&input)).await?;

        counter!("campus_ledger.incomes.recorded", 1);
        info!(
            income_id = created.id,
            cash_movement_id = movement.id,
            "Income recorded"
        );

        self.event_sender
            .publish(Event::IncomeRecorded {
                income_id: created.id,
                enrollment_id: created.enrollment_id,
                amount: created.amount,
                income_date: created.income_date,
            })
            .await;
        Ok(created)
    }

    async fn try_record_income(
        &self,
        input: &NewIncome,
    ) -> Result<(income::Model, cash_movement::Model), ServiceError> {
        let txn = self.db.begin().await?;

        require_active_user(&txn, input.recorded_by).await?;

        let receipt_taken = income::Entity::find()
            .filter(income::Column::ReceiptNumber.eq(input.receipt_number.clone()))
            .one(&txn)
            .await?
            .is_some();
        if receipt_taken {
            return Err(ServiceError::DuplicateError(format!(
                "receipt number {} is already recorded",
                input.receipt_number
            )));
        }

        let target = match input.enrollment_id {
            Some(id) => {
                let current = load_enrollment(&txn, id).await?;
                let paid = current.paid_amount + input.amount;
                if paid > current.final_amount {
                    warn!(enrollment_id = id, "Rejected overpayment");
                    return Err(ServiceError::ConsistencyError(format!(
                        "income of {} would raise paid amount of enrollment {} to {}, above its final amount {}",
                        input.amount, id, paid, current.final_amount
                    )));
                }
                let due = match input.installment_number {
                    Some(number) => Some(open_installment(&txn, id, number, input.amount).await?),
                    None => None,
                };
                Some((current, paid, due))
            }
            None => None,
        };

        let created = income::ActiveModel {
            income_type: Set(input.income_type),
            enrollment_id: Set(input.enrollment_id),
            installment_number: Set(input.installment_number),
            income_date: Set(input.income_date),
            amount: Set(input.amount),
            concept: Set(input.concept.trim().to_string()),
            description: Set(input.description.clone()),
            payment_method: Set(input.payment_method),
            status: Set(TransactionStatus::Registered),
            receipt_number: Set(input.receipt_number.clone()),
            transaction_reference: Set(input.transaction_reference.clone()),
            recorded_by: Set(input.recorded_by),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some((current, paid, due)) = target {
            if let Some(due) = &due {
                settle_installments(&txn, current.id, &created, Some(due)).await?;
            }
            if apply_paid_amount(&txn, &current, paid).await? == PaymentStatus::Paid {
                settle_installments(&txn, current.id, &created, None).await?;
            }
        }

        let movement = mirror_cash(
            &txn,
            CashOrigin::Income,
            created.id,
            created.amount,
            created.income_date,
            format!("Income {}: {}", created.receipt_number, created.concept),
        )
        .await?;

        txn.commit().await?;
        Ok((created, movement))
    }

    /// Records an expense and mirrors it as one outflow movement.
    #[instrument(skip(self, input), fields(category = %input.category, amount = %input.amount))]
    pub async fn record_expense(&self, input: NewExpense) -> Result<expense::Model, ServiceError> {
        input.check()?;

        let (created, movement) =
            with_retry(&self.retry, "record_expense", || self.try_record_expense(&input)).await?;

        counter!("campus_ledger.expenses.recorded", 1);
        info!(
            expense_id = created.id,
            cash_movement_id = movement.id,
            "Expense recorded"
        );

        self.event_sender
            .publish(Event::ExpenseRecorded {
                expense_id: created.id,
                amount: created.amount,
                category: created.category.clone(),
            })
            .await;
        Ok(created)
    }

    async fn try_record_expense(
        &self,
        input: &NewExpense,
    ) -> Result<(expense::Model, cash_movement::Model), ServiceError> {
        let txn = self.db.begin().await?;
        require_active_user(&txn, input.recorded_by).await?;

        let created = expense::ActiveModel {
            expense_date: Set(input.expense_date),
            amount: Set(input.amount),
            category: Set(input.category.trim().to_string()),
            subcategory: Set(input.subcategory.clone()),
            description: Set(input.description.trim().to_string()),
            supplier: Set(input.supplier.clone()),
            supplier_invoice_number: Set(input.supplier_invoice_number.clone()),
            payment_method: Set(input.payment_method),
            receipt_number: Set(input.receipt_number.clone()),
            recorded_by: Set(input.recorded_by),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let movement = mirror_cash(
            &txn,
            CashOrigin::Expense,
            created.id,
            created.amount,
            created.expense_date,
            format!("Expense {}: {}", created.category, created.description),
        )
        .await?;

        txn.commit().await?;
        Ok((created, movement))
    }

    /// Voids an income through compensating entries.
    ///
    /// The income keeps its amount and only changes status. Its enrollment
    /// gives the amount back, an outflow movement reverses the original
    /// inflow and an audit entry records who voided it and why. Installments
    /// the income settled are owed again.
    #[instrument(skip(self, reason))]
    pub async fn void_income(
        &self,
        income_id: i32,
        user_id: i32,
        reason: &str,
    ) -> Result<income::Model, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "voiding an income requires a reason".into(),
            ));
        }

        let (voided, audit_id) = with_retry(&self.retry, "void_income", || {
            self.try_void_income(income_id, user_id, reason)
        })
        .await?;

        counter!("campus_ledger.incomes.voided", 1);
        info!(income_id, audit_id, "Income voided");

        self.event_sender
            .publish(Event::IncomeVoided {
                income_id,
                enrollment_id: voided.enrollment_id,
                amount: voided.amount,
            })
            .await;
        self.event_sender
            .publish(Event::AuditLogged {
                audit_id,
                origin_type: OriginType::Income,
                origin_id: income_id,
            })
            .await;
        Ok(voided)
    }

    async fn try_void_income(
        &self,
        income_id: i32,
        user_id: i32,
        reason: &str,
    ) -> Result<(income::Model, i32), ServiceError> {
        let today = Utc::now().date_naive();
        let txn = self.db.begin().await?;

        require_active_user(&txn, user_id).await?;
        let found = income::Entity::find_by_id(income_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("income {}", income_id)))?;

        let flipped = income::Entity::update_many()
            .col_expr(income::Column::Status, Expr::value(TransactionStatus::Voided))
            .filter(income::Column::Id.eq(income_id))
            .filter(income::Column::Status.ne(TransactionStatus::Voided))
            .exec(&txn)
            .await?;
        if flipped.rows_affected == 0 {
            return Err(ServiceError::ValidationError(format!(
                "income {} is already voided",
                income_id
            )));
        }

        let mut previous = json!({
            "status": found.status.to_string(),
            "amount": found.amount.to_string(),
        });
        let mut updated = json!({ "status": TransactionStatus::Voided.to_string() });

        if let Some(enrollment_id) = found.enrollment_id {
            let current = load_enrollment(&txn, enrollment_id).await?;
            let paid = current.paid_amount - found.amount;
            if paid < Decimal::ZERO {
                return Err(ServiceError::ConsistencyError(format!(
                    "voiding income {} would make the paid amount of enrollment {} negative",
                    income_id, enrollment_id
                )));
            }
            let status = apply_paid_amount(&txn, &current, paid).await?;

            previous["enrollment_paid_amount"] = json!(current.paid_amount.to_string());
            previous["enrollment_payment_status"] = json!(current.payment_status.to_string());
            updated["enrollment_paid_amount"] = json!(paid.to_string());
            updated["enrollment_payment_status"] = json!(status.to_string());

            let reopened = reopen_installments(&txn, income_id, today).await?;
            if reopened > 0 {
                updated["reopened_installments"] = json!(reopened);
            }
        }

        mirror_cash(
            &txn,
            CashOrigin::IncomeReversal,
            found.id,
            found.amount,
            today,
            format!("Reversal of income {}", found.receipt_number),
        )
        .await?;

        let audit = append_entry(
            &txn,
            NewAuditEntry {
                user_id,
                origin_type: OriginType::Income,
                origin_id: income_id,
                action: AuditAction::Void,
                reason: reason.to_string(),
                previous_values: Some(previous),
                new_values: Some(updated),
            },
        )
        .await?;

        let voided = income::Entity::find_by_id(income_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("income {}", income_id)))?;

        txn.commit().await?;
        Ok((voided, audit.id))
    }

    /// Registered -> Confirmed. Financial fields are untouched.
    #[instrument(skip(self))]
    pub async fn confirm_income(
        &self,
        income_id: i32,
        user_id: i32,
    ) -> Result<income::Model, ServiceError> {
        let (found, audit_id) = with_retry(&self.retry, "confirm_income", || {
            self.try_confirm_income(income_id, user_id)
        })
        .await?;

        info!(income_id, "Income confirmed");
        self.event_sender
            .publish(Event::AuditLogged {
                audit_id,
                origin_type: OriginType::Income,
                origin_id: income_id,
            })
            .await;
        Ok(found)
    }

    async fn try_confirm_income(
        &self,
        income_id: i32,
        user_id: i32,
    ) -> Result<(income::Model, i32), ServiceError> {
        let txn = self.db.begin().await?;

        require_active_user(&txn, user_id).await?;

        let confirmed = income::Entity::update_many()
            .col_expr(income::Column::Status, Expr::value(TransactionStatus::Confirmed))
            .filter(income::Column::Id.eq(income_id))
            .filter(income::Column::Status.eq(TransactionStatus::Registered))
            .exec(&txn)
            .await?;
        if confirmed.rows_affected == 0 {
            return match income::Entity::find_by_id(income_id).one(&txn).await? {
                Some(found) => Err(ServiceError::ValidationError(format!(
                    "income {} is {} and cannot be confirmed",
                    income_id, found.status
                ))),
                None => Err(ServiceError::NotFound(format!("income {}", income_id))),
            };
        }

        let audit = append_entry(
            &txn,
            NewAuditEntry {
                user_id,
                origin_type: OriginType::Income,
                origin_id: income_id,
                action: AuditAction::Modify,
                reason: "income confirmed".to_string(),
                previous_values: Some(json!({ "status": TransactionStatus::Registered.to_string() })),
                new_values: Some(json!({ "status": TransactionStatus::Confirmed.to_string() })),
            },
        )
        .await?;

        let found = income::Entity::find_by_id(income_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("income {}", income_id)))?;

        txn.commit().await?;
        Ok((found, audit.id))
    }

    pub async fn get_income(&self, income_id: i32) -> Result<income::Model, ServiceError> {
        income::Entity::find_by_id(income_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("income {}", income_id)))
    }

    pub async fn get_expense(&self, expense_id: i32) -> Result<expense::Model, ServiceError> {
        expense::Entity::find_by_id(expense_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("expense {}", expense_id)))
    }

    pub async fn incomes_for_enrollment(
        &self,
        enrollment_id: i32,
    ) -> Result<Vec<income::Model>, ServiceError> {
        Ok(income::Entity::find()
            .filter(income::Column::EnrollmentId.eq(enrollment_id))
            .order_by_asc(income::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Movements produced by one origin, oldest first.
    pub async fn movements_for(
        &self,
        origin: CashOrigin,
        origin_id: i32,
    ) -> Result<Vec<cash_movement::Model>, ServiceError> {
        Ok(cash_movement::Entity::find()
            .filter(cash_movement::Column::OriginType.eq(origin))
            .filter(cash_movement::Column::OriginId.eq(origin_id))
            .order_by_asc(cash_movement::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Inflows minus outflows over the whole cash ledger.
    pub async fn cash_balance(&self) -> Result<Decimal, ServiceError> {
        let movements = cash_movement::Entity::find().all(&*self.db).await?;
        Ok(movements.iter().map(cash_movement::Model::signed_amount).sum())
    }

    pub async fn cash_totals(&self) -> Result<(Decimal, Decimal), ServiceError> {
        let movements = cash_movement::Entity::find().all(&*self.db).await?;
        Ok(movements
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(inflow, outflow), m| {
                match m.movement_type {
                    MovementType::Inflow => (inflow + m.amount, outflow),
                    MovementType::Outflow => (inflow, outflow + m.amount),
                }
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::models::catalogs::{IdIssuancePlace, PaymentModality};
    use crate::services::enrollments::{EnrollmentService, NewEnrollment};
    use crate::services::parties::{NewStudent, PartyService};
    use crate::services::programs::{NewProgram, ProgramService};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
        }
    }

    /// Migrated in-memory database holding one cash enrollment of 1000.
    async fn cash_enrollment() -> (Arc<DatabaseConnection>, enrollment::Model) {
        let pool = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let db = Arc::new(pool);
        let (sender, _rx) = EventSender::channel(64);

        let student = PartyService::new(db.clone())
            .register_student(NewStudent {
                document_number: "6123450".into(),
                issuance_place: IdIssuancePlace::LaPaz,
                first_names: "Ana".into(),
                last_names: "Quispe".into(),
                birth_date: None,
                phone: None,
                email: None,
                alma_mater: None,
                profession: None,
                photo_path: None,
            })
            .await
            .unwrap();
        let program = ProgramService::new(db.clone())
            .create_program(NewProgram {
                code: "DIP-OPS".into(),
                name: "Diploma in Operations".into(),
                description: None,
                duration_weeks: None,
                total_hours: None,
                base_cost: dec!(1000),
                cash_discount_pct: dec!(0),
                total_seats: 5,
                available_seats: None,
                planned_start: None,
                planned_end: None,
                tutor_id: None,
            })
            .await
            .unwrap();
        let created = EnrollmentService::new(db.clone(), sender, quick(1))
            .create_enrollment(NewEnrollment {
                student_id: student.id,
                program_id: program.id,
                modality: PaymentModality::Cash,
                payment_plan_id: None,
                total_amount: dec!(1000),
                discount_amount: dec!(0),
                final_amount: dec!(1000),
                coordinator_id: None,
                notes: None,
                first_due_date: None,
            })
            .await
            .unwrap();
        (db, created)
    }

    /// One attempt of a 100 posting that reads the enrollment, lets a
    /// competing 50 posting commit when `compete` says so, then writes.
    async fn post_against(
        db: &DatabaseConnection,
        enrollment_id: i32,
        compete: bool,
    ) -> Result<PaymentStatus, ServiceError> {
        let current = load_enrollment(db, enrollment_id).await?;
        if compete {
            apply_paid_amount(db, &current, current.paid_amount + dec!(50)).await?;
        }
        apply_paid_amount(db, &current, current.paid_amount + dec!(100)).await
    }

    fn income(income_type: IncomeType, enrollment_id: Option<i32>, amount: Decimal) -> NewIncome {
        NewIncome {
            income_type,
            enrollment_id,
            installment_number: None,
            income_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            amount,
            concept: "First installment".into(),
            description: None,
            payment_method: PaymentMethod::Cash,
            receipt_number: "R-0001".into(),
            transaction_reference: None,
            recorded_by: 1,
        }
    }

    #[test]
    fn non_positive_amounts_are_rejected_first() {
        assert_matches!(
            income(IncomeType::Installment, Some(1), dec!(0)).check(),
            Err(ServiceError::ValidationError(msg)) if msg.contains("amount")
        );
        assert_matches!(
            income(IncomeType::Other, None, dec!(-5)).check(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn income_type_decides_enrollment_reference() {
        assert!(income(IncomeType::Installment, Some(1), dec!(10)).check().is_ok());
        assert!(income(IncomeType::Other, None, dec!(10)).check().is_ok());
        assert_matches!(
            income(IncomeType::CashEnrollment, None, dec!(10)).check(),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            income(IncomeType::Other, Some(1), dec!(10)).check(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn blank_receipt_is_rejected() {
        let mut input = income(IncomeType::Other, None, dec!(10));
        input.receipt_number = " ".into();
        assert_matches!(input.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn expense_category_is_bounded() {
        let mut expense = NewExpense {
            expense_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            amount: dec!(250),
            category: "Rent".into(),
            subcategory: None,
            description: "March rent".into(),
            supplier: None,
            supplier_invoice_number: None,
            payment_method: PaymentMethod::BankTransfer,
            receipt_number: None,
            recorded_by: 1,
        };
        assert!(expense.check().is_ok());

        expense.category = "x".repeat(51);
        assert_matches!(expense.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn only_installment_incomes_carry_a_number() {
        let mut numbered = income(IncomeType::Installment, Some(1), dec!(250));
        numbered.installment_number = Some(2);
        assert!(numbered.check().is_ok());

        let mut cash = income(IncomeType::CashEnrollment, Some(1), dec!(900));
        cash.installment_number = Some(1);
        assert_matches!(cash.check(), Err(ServiceError::ValidationError(msg)) if msg.contains("installment 1"));
    }

    #[tokio::test]
    async fn stale_version_loses_the_guarded_write() {
        let (db, created) = cash_enrollment().await;
        assert_eq!(created.version, 1);

        let status = apply_paid_amount(&*db, &created, dec!(100)).await.unwrap();
        assert_eq!(status, PaymentStatus::Partial);

        assert_matches!(
            apply_paid_amount(&*db, &created, dec!(300)).await,
            Err(ServiceError::ConcurrentModification { entity: "enrollment", id }) if id == created.id
        );

        let stored = load_enrollment(&*db, created.id).await.unwrap();
        assert_eq!(stored.paid_amount, dec!(100));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn lost_race_is_replayed_against_fresh_state() {
        let (db, created) = cash_enrollment().await;
        let enrollment_id = created.id;
        let calls = Arc::new(AtomicU32::new(0));

        let result = with_retry(&quick(5), "record_income", || {
            let db = db.clone();
            let calls = calls.clone();
            async move {
                let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
                post_against(&db, enrollment_id, first).await
            }
        })
        .await;

        assert_eq!(result.unwrap(), PaymentStatus::Partial);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stored = load_enrollment(&*db, created.id).await.unwrap();
        assert_eq!(stored.paid_amount, dec!(150));
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn conflict_surfaces_once_attempts_are_exhausted() {
        let (db, created) = cash_enrollment().await;
        let enrollment_id = created.id;
        let calls = Arc::new(AtomicU32::new(0));

        let result = with_retry(&quick(3), "record_income", || {
            let db = db.clone();
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                post_against(&db, enrollment_id, true).await
            }
        })
        .await;

        assert_matches!(
            result,
            Err(ServiceError::ConcurrentModification { entity: "enrollment", .. })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stored = load_enrollment(&*db, created.id).await.unwrap();
        assert_eq!(stored.paid_amount, dec!(150));
        assert_eq!(stored.version, 4);
    }
}
