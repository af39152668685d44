//! Read-only projections over committed state. Every call recomputes from
//! the tables; nothing here is cached or written.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;

use crate::errors::ServiceError;
use crate::models::catalogs::{
    AcademicStatus, IncomeType, InstallmentStatus, MovementType, PaymentMethod, PaymentStatus,
    ProgramStatus, TransactionStatus,
};
use crate::models::{
    academic_program, cash_movement, enrollment, income, installment, student, user,
};

/// Financial summary report for one program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramFinancialSummary {
    pub program_id: i32,
    pub code: String,
    pub name: String,
    pub status: ProgramStatus,
    pub total_seats: i32,
    pub available_seats: i32,
    pub enrollments: usize,
    pub occupancy_percent: Decimal,
    pub expected_revenue: Decimal,
    pub collected: Decimal,
    pub outstanding: Decimal,
}

/// Payment position of one enrollment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPaymentStatus {
    pub enrollment_id: i32,
    pub student_id: i32,
    pub student_name: String,
    pub document_number: String,
    pub program_code: String,
    pub program_name: String,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance: Decimal,
    pub payment_status: PaymentStatus,
    pub academic_status: AcademicStatus,
}

/// Cash totals for one day and direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCashMovement {
    pub date: NaiveDate,
    pub movement_type: MovementType,
    pub movements: usize,
    pub total: Decimal,
}

/// One line of the detailed income listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeListingRow {
    pub income_id: i32,
    pub receipt_number: String,
    pub income_date: NaiveDate,
    pub income_type: IncomeType,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub concept: String,
    pub student_name: Option<String>,
    pub program_code: Option<String>,
    pub recorded_by: String,
}

/// An installment still owed after its due date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueInstallmentRow {
    pub installment_id: i32,
    pub enrollment_id: i32,
    pub number: i32,
    pub student_name: String,
    pub document_number: String,
    pub program_code: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub status: InstallmentStatus,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn program_financial_summary(
        &self,
    ) -> Result<Vec<ProgramFinancialSummary>, ServiceError> {
        let db = &*self.db;
        let programs = academic_program::Entity::find()
            .order_by_asc(academic_program::Column::Code)
            .all(db)
            .await?;
        let enrollments = enrollment::Entity::find().all(db).await?;

        let mut per_program: HashMap<i32, (usize, Decimal, Decimal)> = HashMap::new();
        for e in &enrollments {
            let entry = per_program
                .entry(e.program_id)
                .or_insert((0, Decimal::ZERO, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += e.final_amount;
            entry.2 += e.paid_amount;
        }

        Ok(programs
            .into_iter()
            .map(|p| {
                let (count, expected, collected) = per_program
                    .get(&p.id)
                    .copied()
                    .unwrap_or((0, Decimal::ZERO, Decimal::ZERO));
                ProgramFinancialSummary {
                    program_id: p.id,
                    occupancy_percent: p.occupancy_percent(),
                    code: p.code,
                    name: p.name,
                    status: p.status,
                    total_seats: p.total_seats,
                    available_seats: p.available_seats,
                    enrollments: count,
                    expected_revenue: expected,
                    collected,
                    outstanding: expected - collected,
                }
            })
            .collect())
    }

    /// Payment status per enrollment, optionally for a single student.
    #[instrument(skip(self))]
    pub async fn student_payment_status(
        &self,
        student_id: Option<i32>,
    ) -> Result<Vec<StudentPaymentStatus>, ServiceError> {
        let db = &*self.db;
        let mut query = enrollment::Entity::find()
            .find_also_related(student::Entity)
            .order_by_asc(enrollment::Column::Id);
        if let Some(id) = student_id {
            query = query.filter(enrollment::Column::StudentId.eq(id));
        }
        let rows = query.all(db).await?;

        let programs: HashMap<i32, academic_program::Model> = academic_program::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|(e, s)| {
                let s = s?;
                let p = programs.get(&e.program_id)?;
                Some(StudentPaymentStatus {
                    enrollment_id: e.id,
                    student_id: s.id,
                    student_name: s.full_name(),
                    document_number: s.document_number,
                    program_code: p.code.clone(),
                    program_name: p.name.clone(),
                    balance: e.balance(),
                    final_amount: e.final_amount,
                    paid_amount: e.paid_amount,
                    payment_status: e.payment_status,
                    academic_status: e.academic_status,
                })
            })
            .collect())
    }

    /// Movement counts and totals per day and direction in `[from, to]`.
    #[instrument(skip(self))]
    pub async fn daily_cash_movement(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCashMovement>, ServiceError> {
        let movements = cash_movement::Entity::find()
            .filter(cash_movement::Column::MovementDate.between(from, to))
            .all(&*self.db)
            .await?;

        let mut grouped: BTreeMap<(NaiveDate, bool), (usize, Decimal)> = BTreeMap::new();
        for m in &movements {
            let key = (m.movement_date, m.movement_type == MovementType::Outflow);
            let entry = grouped.entry(key).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += m.amount;
        }

        Ok(grouped
            .into_iter()
            .map(|((date, outflow), (count, total))| DailyCashMovement {
                date,
                movement_type: if outflow {
                    MovementType::Outflow
                } else {
                    MovementType::Inflow
                },
                movements: count,
                total,
            })
            .collect())
    }

    /// Every income dated in `[from, to]` with who paid and who recorded it.
    #[instrument(skip(self))]
    pub async fn income_listing(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IncomeListingRow>, ServiceError> {
        let db = &*self.db;
        let incomes = income::Entity::find()
            .filter(income::Column::IncomeDate.between(from, to))
            .order_by_asc(income::Column::IncomeDate)
            .order_by_asc(income::Column::Id)
            .all(db)
            .await?;

        let enrollments: HashMap<i32, enrollment::Model> = enrollment::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let students: HashMap<i32, student::Model> = student::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let programs: HashMap<i32, academic_program::Model> = academic_program::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let users: HashMap<i32, String> = user::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(incomes
            .into_iter()
            .map(|i| {
                let enrolled = i.enrollment_id.and_then(|id| enrollments.get(&id));
                IncomeListingRow {
                    student_name: enrolled
                        .and_then(|e| students.get(&e.student_id))
                        .map(student::Model::full_name),
                    program_code: enrolled
                        .and_then(|e| programs.get(&e.program_id))
                        .map(|p| p.code.clone()),
                    recorded_by: users.get(&i.recorded_by).cloned().unwrap_or_default(),
                    income_id: i.id,
                    receipt_number: i.receipt_number,
                    income_date: i.income_date,
                    income_type: i.income_type,
                    amount: i.amount,
                    payment_method: i.payment_method,
                    status: i.status,
                    concept: i.concept,
                }
            })
            .collect())
    }

    /// Open installments due before `as_of`, oldest due date first. Reads
    /// the due dates directly, so rows show up before any sweep flags them.
    #[instrument(skip(self))]
    pub async fn overdue_installments(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<OverdueInstallmentRow>, ServiceError> {
        let db = &*self.db;
        let owed = installment::Entity::find()
            .filter(
                installment::Column::Status
                    .is_in([InstallmentStatus::Pending, InstallmentStatus::Overdue]),
            )
            .filter(installment::Column::DueDate.lt(as_of))
            .find_also_related(enrollment::Entity)
            .order_by_asc(installment::Column::DueDate)
            .order_by_asc(installment::Column::Id)
            .all(db)
            .await?;

        let students: HashMap<i32, student::Model> = student::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let programs: HashMap<i32, String> = academic_program::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.code))
            .collect();

        Ok(owed
            .into_iter()
            .filter_map(|(due, e)| {
                let e = e?;
                let s = students.get(&e.student_id)?;
                Some(OverdueInstallmentRow {
                    installment_id: due.id,
                    enrollment_id: e.id,
                    number: due.number,
                    student_name: s.full_name(),
                    document_number: s.document_number.clone(),
                    program_code: programs.get(&e.program_id).cloned().unwrap_or_default(),
                    amount: due.amount,
                    due_date: due.due_date,
                    days_overdue: due.days_overdue(as_of),
                    status: due.status,
                })
            })
            .collect())
    }
}
