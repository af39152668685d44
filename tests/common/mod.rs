#![allow(dead_code)]

use std::sync::Arc;

use campus_ledger::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    events::{self, EventSender},
    models::{
        academic_program,
        catalogs::{IdIssuancePlace, IncomeType, PaymentMethod, PaymentModality, UserRole},
        enrollment, payment_plan, student, user,
    },
    services::{
        enrollments::NewEnrollment,
        ledger::{NewExpense, NewIncome},
        parties::{NewStudent, NewUser},
        programs::{NewPaymentPlan, NewProgram},
    },
    ServiceContainer, ServiceFactory,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Services wired to a fresh, migrated SQLite database with one active
/// cashier to record operations under.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub services: ServiceContainer,
    pub cashier: user::Model,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: Option<TempDir>,
}

impl TestContext {
    /// Private in-memory database behind a single connection.
    pub async fn new() -> Self {
        let cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        Self::connect(DbConfig::in_memory_sqlite(), cfg, None).await
    }

    /// Database file in a temporary directory behind `max_connections`
    /// pooled connections, so transactions really run side by side.
    pub async fn on_disk(max_connections: u32) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());
        let db_config = DbConfig {
            url: url.clone(),
            max_connections,
            min_connections: 1,
            ..Default::default()
        };
        let mut cfg = AppConfig::new(url, "test".to_string());
        cfg.posting_max_attempts = 25;
        Self::connect(db_config, cfg, Some(dir)).await
    }

    async fn connect(db_config: DbConfig, mut cfg: AppConfig, dir: Option<TempDir>) -> Self {
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to migrate test database");
        let db = Arc::new(pool);

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        cfg.attachment_root = "/var/lib/campus-ledger/attachments".to_string();
        let factory = ServiceFactory::new(db.clone(), event_sender, cfg);
        let services = ServiceContainer::new(&factory).expect("services");

        let cashier = services
            .parties
            .provision_user(NewUser {
                username: "cashier.01".to_string(),
                password: "s3cret-passphrase".to_string(),
                full_name: "Lucia Mamani".to_string(),
                email: Some("lucia.mamani@example.com".to_string()),
                role: UserRole::Cashier,
            })
            .await
            .expect("seed cashier");

        Self {
            db,
            services,
            cashier,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub async fn student(&self, document_number: &str) -> student::Model {
        self.services
            .parties
            .register_student(NewStudent {
                document_number: document_number.to_string(),
                issuance_place: IdIssuancePlace::LaPaz,
                first_names: "Student".to_string(),
                last_names: document_number.to_string(),
                birth_date: None,
                phone: None,
                email: None,
                alma_mater: None,
                profession: None,
                photo_path: None,
            })
            .await
            .expect("register student")
    }

    pub async fn program(&self, code: &str, seats: i32) -> academic_program::Model {
        self.services
            .programs
            .create_program(NewProgram {
                code: code.to_string(),
                name: format!("Program {}", code),
                description: None,
                duration_weeks: Some(24),
                total_hours: Some(480),
                base_cost: dec!(1000),
                cash_discount_pct: dec!(10),
                total_seats: seats,
                available_seats: None,
                planned_start: NaiveDate::from_ymd_opt(2025, 4, 1),
                planned_end: NaiveDate::from_ymd_opt(2025, 9, 30),
                tutor_id: None,
            })
            .await
            .expect("create program")
    }

    pub async fn plan(&self, program_id: i32) -> payment_plan::Model {
        self.services
            .programs
            .create_payment_plan(NewPaymentPlan {
                program_id,
                name: "Four installments".to_string(),
                installment_count: 4,
                interval_days: 30,
                description: None,
            })
            .await
            .expect("create payment plan")
    }

    /// Installment enrollment with `final = 1000`, `discount = 0`.
    pub async fn enrollment(
        &self,
        student_id: i32,
        program_id: i32,
        plan_id: i32,
    ) -> enrollment::Model {
        self.services
            .enrollments
            .create_enrollment(installment_enrollment(student_id, program_id, plan_id))
            .await
            .expect("create enrollment")
    }

    /// Student, program, plan and one enrollment with `final = 1000`.
    pub async fn enrolled(&self) -> enrollment::Model {
        let student = self.student("4789123").await;
        let program = self.program("DIP-DATA", 20).await;
        let plan = self.plan(program.id).await;
        self.enrollment(student.id, program.id, plan.id).await
    }

    pub async fn reload_program(&self, program_id: i32) -> academic_program::Model {
        self.services
            .programs
            .get_program(program_id)
            .await
            .expect("program exists")
    }

    pub async fn reload_enrollment(&self, enrollment_id: i32) -> enrollment::Model {
        self.services
            .enrollments
            .get_enrollment(enrollment_id)
            .await
            .expect("enrollment exists")
    }
}

pub fn installment_enrollment(student_id: i32, program_id: i32, plan_id: i32) -> NewEnrollment {
    NewEnrollment {
        student_id,
        program_id,
        modality: PaymentModality::Installments,
        payment_plan_id: Some(plan_id),
        total_amount: dec!(1000),
        discount_amount: dec!(0),
        final_amount: dec!(1000),
        coordinator_id: None,
        notes: None,
        first_due_date: None,
    }
}

pub fn installment_income(
    enrollment_id: i32,
    amount: Decimal,
    receipt: &str,
    recorded_by: i32,
) -> NewIncome {
    NewIncome {
        income_type: IncomeType::Installment,
        enrollment_id: Some(enrollment_id),
        installment_number: None,
        income_date: NaiveDate::from_ymd_opt(2025, 4, 5).expect("valid date"),
        amount,
        concept: "Tuition installment".to_string(),
        description: None,
        payment_method: PaymentMethod::Cash,
        receipt_number: receipt.to_string(),
        transaction_reference: None,
        recorded_by,
    }
}

/// Income settling installment `number` of the four-way schedule.
pub fn numbered_installment_income(
    enrollment_id: i32,
    number: i32,
    amount: Decimal,
    receipt: &str,
    recorded_by: i32,
) -> NewIncome {
    NewIncome {
        installment_number: Some(number),
        concept: format!("Installment {} of 4", number),
        ..installment_income(enrollment_id, amount, receipt, recorded_by)
    }
}

pub fn rent_expense(amount: Decimal, recorded_by: i32) -> NewExpense {
    NewExpense {
        expense_date: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
        amount,
        category: "Rent".to_string(),
        subcategory: None,
        description: "Classroom rent for April".to_string(),
        supplier: Some("Edificio Central".to_string()),
        supplier_invoice_number: None,
        payment_method: PaymentMethod::BankTransfer,
        receipt_number: None,
        recorded_by,
    }
}
