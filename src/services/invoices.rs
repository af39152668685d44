use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::validation::{not_blank, TAX_ID_RE};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::catalogs::InvoiceStatus;
use crate::models::invoice;

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax rates applied to invoice subtotals, as fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceRates {
    pub vat: Decimal,
    pub transaction_tax: Decimal,
}

impl InvoiceRates {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let convert = |name: &str, rate: f64| {
            Decimal::from_f64(rate)
                .ok_or_else(|| ServiceError::ConfigError(format!("{} {} is not representable", name, rate)))
        };
        Ok(Self {
            vat: convert("vat_rate", cfg.vat_rate)?,
            transaction_tax: convert("transaction_tax_rate", cfg.transaction_tax_rate)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub transaction_tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn compute(
        subtotal: Decimal,
        apply_vat: bool,
        apply_transaction_tax: bool,
        rates: InvoiceRates,
    ) -> Self {
        let subtotal = cents(subtotal);
        let vat_amount = if apply_vat {
            cents(subtotal * rates.vat)
        } else {
            Decimal::ZERO
        };
        let transaction_tax_amount = if apply_transaction_tax {
            cents(subtotal * rates.transaction_tax)
        } else {
            Decimal::ZERO
        };
        Self {
            subtotal,
            vat_amount,
            transaction_tax_amount,
            total: subtotal + vat_amount + transaction_tax_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInvoice {
    #[validate(length(max = 50), custom = "not_blank")]
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    #[validate(regex = "TAX_ID_RE")]
    pub customer_tax_id: Option<String>,
    #[validate(length(max = 200), custom = "not_blank")]
    pub business_name: String,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub transaction_tax_amount: Decimal,
    pub total: Decimal,
    #[validate(custom = "not_blank")]
    pub concept: String,
}

impl NewInvoice {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        if self.subtotal <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "invoice subtotal must be greater than zero, got {}",
                self.subtotal
            )));
        }
        if self.vat_amount < Decimal::ZERO || self.transaction_tax_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "invoice taxes must not be negative".into(),
            ));
        }
        let expected = self.subtotal + self.vat_amount + self.transaction_tax_amount;
        if self.total != expected {
            return Err(ServiceError::ConsistencyError(format!(
                "invoice total {} does not match subtotal plus taxes {}",
                self.total, expected
            )));
        }
        Ok(())
    }
}

/// Manual registry of issued invoices.
#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    rates: InvoiceRates,
}

impl InvoiceService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, rates: InvoiceRates) -> Self {
        Self {
            db,
            event_sender,
            rates,
        }
    }

    pub fn quote(&self, subtotal: Decimal, apply_vat: bool, apply_transaction_tax: bool) -> InvoiceTotals {
        InvoiceTotals::compute(subtotal, apply_vat, apply_transaction_tax, self.rates)
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<invoice::Model>, ServiceError> {
        Ok(invoice::Entity::find()
            .filter(invoice::Column::InvoiceNumber.eq(number))
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number, total = %input.total))]
    pub async fn register_invoice(&self, input: NewInvoice) -> Result<invoice::Model, ServiceError> {
        input.check()?;

        if self.find_by_number(&input.invoice_number).await?.is_some() {
            warn!("Rejected duplicate invoice number");
            return Err(ServiceError::DuplicateError(format!(
                "invoice {} is already registered",
                input.invoice_number
            )));
        }

        let created = invoice::ActiveModel {
            invoice_number: Set(input.invoice_number.trim().to_string()),
            issue_date: Set(input.issue_date),
            customer_tax_id: Set(input.customer_tax_id),
            business_name: Set(input.business_name.trim().to_string()),
            subtotal: Set(input.subtotal),
            vat_amount: Set(input.vat_amount),
            transaction_tax_amount: Set(input.transaction_tax_amount),
            total: Set(input.total),
            concept: Set(input.concept.trim().to_string()),
            status: Set(InvoiceStatus::Issued),
            exported: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(invoice_id = created.id, "Invoice registered");
        self.event_sender
            .publish(Event::InvoiceIssued {
                invoice_id: created.id,
                invoice_number: created.invoice_number.clone(),
                total: created.total,
            })
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn void_invoice(&self, invoice_number: &str) -> Result<invoice::Model, ServiceError> {
        let found = self
            .find_by_number(invoice_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {}", invoice_number)))?;
        if found.status == InvoiceStatus::Voided {
            return Err(ServiceError::ValidationError(format!(
                "invoice {} is already voided",
                invoice_number
            )));
        }

        let mut active: invoice::ActiveModel = found.into();
        active.status = Set(InvoiceStatus::Voided);
        let voided = active.update(&*self.db).await?;
        info!(invoice_id = voided.id, "Invoice voided");
        Ok(voided)
    }

    /// Flags an invoice as handed to the tax authority export.
    pub async fn mark_exported(&self, invoice_number: &str) -> Result<invoice::Model, ServiceError> {
        let found = self
            .find_by_number(invoice_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {}", invoice_number)))?;

        let mut active: invoice::ActiveModel = found.into();
        active.exported = Set(true);
        Ok(active.update(&*self.db).await?)
    }

    /// Issued invoices not yet exported, by issue date.
    pub async fn pending_export(&self) -> Result<Vec<invoice::Model>, ServiceError> {
        Ok(invoice::Entity::find()
            .filter(invoice::Column::Status.eq(InvoiceStatus::Issued))
            .filter(invoice::Column::Exported.eq(false))
            .order_by_asc(invoice::Column::IssueDate)
            .order_by_asc(invoice::Column::Id)
            .all(&*self.db)
            .await?)
    }
}
