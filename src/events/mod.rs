use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::catalogs::{DocumentType, OriginType};

/// Default buffer of the in-process event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Facts published after the owning transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    EnrollmentCreated {
        enrollment_id: i32,
        student_id: i32,
        program_id: i32,
        seats_left: i32,
    },
    EnrollmentRemoved {
        enrollment_id: i32,
        program_id: i32,
    },
    IncomeRecorded {
        income_id: i32,
        enrollment_id: Option<i32>,
        amount: Decimal,
        income_date: NaiveDate,
    },
    IncomeVoided {
        income_id: i32,
        enrollment_id: Option<i32>,
        amount: Decimal,
    },
    ExpenseRecorded {
        expense_id: i32,
        amount: Decimal,
        category: String,
    },
    AttachmentAdded {
        attachment_id: i32,
        origin_type: OriginType,
        origin_id: i32,
        document_type: DocumentType,
    },
    AuditLogged {
        audit_id: i32,
        origin_type: OriginType,
        origin_id: i32,
    },
    SettingChanged {
        key: String,
    },
    InvoiceIssued {
        invoice_id: i32,
        invoice_number: String,
        total: Decimal,
    },
    OverdueDetected {
        as_of: NaiveDate,
        installments: u64,
        enrollments: u64,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::EnrollmentCreated { .. } => "enrollment_created",
            Event::EnrollmentRemoved { .. } => "enrollment_removed",
            Event::IncomeRecorded { .. } => "income_recorded",
            Event::IncomeVoided { .. } => "income_voided",
            Event::ExpenseRecorded { .. } => "expense_recorded",
            Event::AttachmentAdded { .. } => "attachment_added",
            Event::AuditLogged { .. } => "audit_logged",
            Event::SettingChanged { .. } => "setting_changed",
            Event::InvoiceIssued { .. } => "invoice_issued",
            Event::OverdueDetected { .. } => "overdue_detected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sender plus the receiving half to hand to [`process_events`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes a post-commit event. The committed operation stands even
    /// when nobody is listening, so failures are only logged.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Event dropped after commit");
        }
    }
}

/// Drains the channel, logging every event until all senders are gone.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(
            event = event.name(),
            received_at = %Utc::now(),
            payload = ?event,
            "Processed domain event"
        );
    }

    info!("Event processing loop finished");
}
