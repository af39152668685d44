use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::{
        attachments::AttachmentService,
        audit::AuditService,
        enrollments::EnrollmentService,
        invoices::{InvoiceRates, InvoiceService},
        ledger::LedgerService,
        parties::PartyService,
        programs::ProgramService,
        reports::ReportService,
        retry::RetryConfig,
        settings::SettingsService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    config: AppConfig,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: AppConfig) -> Self {
        Self {
            db_pool,
            event_sender,
            config,
        }
    }

    pub fn party_service(&self) -> PartyService {
        PartyService::new(self.db_pool.clone())
    }

    pub fn program_service(&self) -> ProgramService {
        ProgramService::new(self.db_pool.clone())
    }

    /// Retry budget for transactions that lose a write race
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from_app_config(&self.config)
    }

    pub fn enrollment_service(&self) -> EnrollmentService {
        EnrollmentService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.retry_config(),
        )
    }

    pub fn ledger_service(&self) -> LedgerService {
        LedgerService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.retry_config(),
        )
    }

    pub fn attachment_service(&self) -> AttachmentService {
        AttachmentService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.config.attachment_root.clone(),
        )
    }

    pub fn audit_service(&self) -> AuditService {
        AuditService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn settings_service(&self) -> SettingsService {
        SettingsService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    /// Fails when the configured tax rates cannot be represented as decimals
    pub fn invoice_service(&self) -> Result<InvoiceService, ServiceError> {
        Ok(InvoiceService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            InvoiceRates::from_config(&self.config)?,
        ))
    }

    pub fn report_service(&self) -> ReportService {
        ReportService::new(self.db_pool.clone())
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }

    /// Gets a reference to the event sender
    pub fn event_sender(&self) -> &EventSender {
        &self.event_sender
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub parties: Arc<PartyService>,
    pub programs: Arc<ProgramService>,
    pub enrollments: Arc<EnrollmentService>,
    pub ledger: Arc<LedgerService>,
    pub attachments: Arc<AttachmentService>,
    pub audit: Arc<AuditService>,
    pub settings: Arc<SettingsService>,
    pub invoices: Arc<InvoiceService>,
    pub reports: Arc<ReportService>,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub fn new(factory: &ServiceFactory) -> Result<Self, ServiceError> {
        Ok(Self {
            parties: Arc::new(factory.party_service()),
            programs: Arc::new(factory.program_service()),
            enrollments: Arc::new(factory.enrollment_service()),
            ledger: Arc::new(factory.ledger_service()),
            attachments: Arc::new(factory.attachment_service()),
            audit: Arc::new(factory.audit_service()),
            settings: Arc::new(factory.settings_service()),
            invoices: Arc::new(factory.invoice_service()?),
            reports: Arc::new(factory.report_service()),
        })
    }
}
