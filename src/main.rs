use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use campus_ledger::{
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{self, EventSender, DEFAULT_EVENT_CHANNEL_CAPACITY},
    services::{
        factory::ServiceFactory,
        reports::{
            DailyCashMovement, IncomeListingRow, OverdueInstallmentRow, ProgramFinancialSummary,
            StudentPaymentStatus,
        },
        settings::SettingsService,
    },
};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(matches!(cli.command, Commands::Migrate)).await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to apply migrations")?;
            println!("Migrations applied");
        }
        Commands::Overdue(args) => {
            let as_of = args.resolve();
            let sweep = context
                .factory
                .enrollment_service()
                .refresh_overdue(as_of)
                .await
                .context("overdue sweep failed")?;
            if cli.json {
                print_json(&sweep)?;
            } else {
                println!(
                    "{}: {} installment(s) now overdue, {} enrollment(s) flagged",
                    as_of, sweep.installments, sweep.enrollments
                );
            }
        }
        Commands::Settings(command) => handle_settings_command(&context, command, cli.json).await?,
        Commands::Report(command) => handle_report_command(&context, command, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "campus-ledger",
    about = "Enrollment, billing and cash ledger administration",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Flag installments past due and the enrollments that owe them
    Overdue(AsOfArgs),
    #[command(subcommand)]
    Settings(SettingsCommands),
    #[command(subcommand)]
    Report(ReportCommands),
}

#[derive(Subcommand)]
enum SettingsCommands {
    List,
    Get(SettingKeyArgs),
    Set(SettingSetArgs),
    /// Insert the default settings that are still missing
    Seed,
}

#[derive(Args)]
struct SettingKeyArgs {
    #[arg(help = "Setting key (case-sensitive)")]
    key: String,
}

#[derive(Args)]
struct SettingSetArgs {
    #[arg(help = "Setting key (case-sensitive)")]
    key: String,
    #[arg(help = "New value")]
    value: String,
    #[arg(long, help = "Optional description stored with the setting")]
    description: Option<String>,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Financial summary per program
    Programs,
    /// Payment status per enrollment
    Students(StudentReportArgs),
    /// Daily cash totals
    Cash(DateRangeArgs),
    /// Detailed income listing
    Incomes(DateRangeArgs),
    /// Installments still owed after their due date
    Overdue(AsOfArgs),
}

#[derive(Args)]
struct AsOfArgs {
    #[arg(long, help = "Reference day (YYYY-MM-DD); defaults to today")]
    as_of: Option<NaiveDate>,
}

impl AsOfArgs {
    fn resolve(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Args)]
struct StudentReportArgs {
    #[arg(long, help = "Restrict to one student id")]
    student: Option<i32>,
}

#[derive(Args)]
struct DateRangeArgs {
    #[arg(long, help = "First day (YYYY-MM-DD); defaults to 30 days ago")]
    from: Option<NaiveDate>,
    #[arg(long, help = "Last day (YYYY-MM-DD); defaults to today")]
    to: Option<NaiveDate>,
}

impl DateRangeArgs {
    fn resolve(&self) -> Result<(NaiveDate, NaiveDate)> {
        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self
            .from
            .unwrap_or_else(|| to - chrono::Duration::days(30));
        if from > to {
            return Err(anyhow!("--from {} is after --to {}", from, to));
        }
        Ok((from, to))
    }
}

struct CliContext {
    db: Arc<DbPool>,
    factory: ServiceFactory,
}

impl CliContext {
    async fn initialize(migrating: bool) -> Result<Self> {
        let config: AppConfig = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate && !migrating {
            db::run_migrations(&db_pool)
                .await
                .context("failed to apply migrations")?;
        }
        let db = Arc::new(db_pool);

        let (event_sender, event_rx) = EventSender::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        tokio::spawn(events::process_events(event_rx));

        info!(environment = %config.environment, "CLI context ready");
        Ok(Self {
            factory: ServiceFactory::new(db.clone(), event_sender, config),
            db,
        })
    }

    async fn settings(&self) -> Result<SettingsService> {
        let settings = self.factory.settings_service();
        settings.load().await.context("failed to load settings")?;
        Ok(settings)
    }
}

async fn handle_settings_command(context: &CliContext, command: SettingsCommands, json: bool) -> Result<()> {
    let settings = context.settings().await?;

    match command {
        SettingsCommands::List => {
            let rows = settings.list().await?;
            if json {
                print_json(&rows)?;
            } else {
                for row in &rows {
                    println!("{} = {}", row.key, row.value);
                }
            }
        }
        SettingsCommands::Get(args) => {
            let value = settings
                .get(&args.key)
                .ok_or_else(|| anyhow!("setting {} is not defined", args.key))?;
            if json {
                print_json(&serde_json::json!({ "key": args.key, "value": value }))?;
            } else {
                println!("{}", value);
            }
        }
        SettingsCommands::Set(args) => {
            let stored = settings
                .upsert(&args.key, &args.value, args.description.as_deref())
                .await?;
            if json {
                print_json(&stored)?;
            } else {
                println!("{} = {} (updated {})", stored.key, stored.value, stored.updated_at);
            }
        }
        SettingsCommands::Seed => {
            let added = settings.seed_defaults().await?;
            if json {
                print_json(&serde_json::json!({ "added": added }))?;
            } else {
                println!("Seeded {} default setting(s)", added);
            }
        }
    }
    Ok(())
}

async fn handle_report_command(context: &CliContext, command: ReportCommands, json: bool) -> Result<()> {
    let reports = context.factory.report_service();

    match command {
        ReportCommands::Programs => {
            let rows = reports.program_financial_summary().await?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_program);
            }
        }
        ReportCommands::Students(args) => {
            let rows = reports.student_payment_status(args.student).await?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_student);
            }
        }
        ReportCommands::Cash(range) => {
            let (from, to) = range.resolve()?;
            let rows = reports.daily_cash_movement(from, to).await?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_cash);
            }
        }
        ReportCommands::Incomes(range) => {
            let (from, to) = range.resolve()?;
            let rows = reports.income_listing(from, to).await?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_income);
            }
        }
        ReportCommands::Overdue(args) => {
            let rows = reports.overdue_installments(args.resolve()).await?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_overdue);
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_program(row: &ProgramFinancialSummary) {
    println!(
        "- {} {} • {} • seats {}/{} ({}%) • expected {} • collected {} • outstanding {}",
        row.code,
        row.name,
        row.status,
        row.total_seats - row.available_seats,
        row.total_seats,
        row.occupancy_percent,
        row.expected_revenue,
        row.collected,
        row.outstanding
    );
}

fn render_student(row: &StudentPaymentStatus) {
    println!(
        "- {} ({}) • {} • paid {} of {} • balance {} • {} / {}",
        row.student_name,
        row.document_number,
        row.program_code,
        row.paid_amount,
        row.final_amount,
        row.balance,
        row.payment_status,
        row.academic_status
    );
}

fn render_cash(row: &DailyCashMovement) {
    println!(
        "- {} • {} • {} movement(s) • {}",
        row.date, row.movement_type, row.movements, row.total
    );
}

fn render_income(row: &IncomeListingRow) {
    println!(
        "- {} • {} • {} {} • {} • {} • {}",
        row.income_date,
        row.receipt_number,
        row.income_type,
        row.amount,
        row.status,
        row.student_name.as_deref().unwrap_or("-"),
        row.concept
    );
}

fn render_overdue(row: &OverdueInstallmentRow) {
    println!(
        "- {} ({}) • {} #{} • {} due {} • {} day(s) late • {}",
        row.student_name,
        row.document_number,
        row.program_code,
        row.number,
        row.amount,
        row.due_date,
        row.days_overdue,
        row.status
    );
}
