//! Property-based tests for the ledger's pure rules.
//!
//! These cover the invariants that hold for any amounts: derived payment
//! status, enrollment quotes and invoice totals.

use campus_ledger::models::academic_program;
use campus_ledger::models::catalogs::{FileExtension, PaymentModality, PaymentStatus, ProgramStatus};
use campus_ledger::services::enrollments::quote_enrollment;
use campus_ledger::services::invoices::{InvoiceRates, InvoiceTotals};
use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn pct_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|basis| Decimal::new(basis, 2))
}

fn program(base_cost: Decimal, cash_pct: Decimal, promo_pct: Decimal) -> academic_program::Model {
    let now = Utc::now();
    academic_program::Model {
        id: 1,
        code: "PROP-01".into(),
        name: "Property program".into(),
        description: None,
        duration_weeks: None,
        total_hours: None,
        base_cost,
        cash_discount_pct: cash_pct,
        total_seats: 30,
        available_seats: 30,
        status: ProgramStatus::Planned,
        planned_start: None,
        planned_end: None,
        actual_start: None,
        actual_end: None,
        tutor_id: None,
        promotion_active: true,
        promotion_description: Some("Early bird".into()),
        promotion_discount_pct: promo_pct,
        promotion_deadline: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn payment_status_follows_amounts(paid in cents_strategy(), final_amount in cents_strategy()) {
        let status = PaymentStatus::from_amounts(paid, final_amount);
        if paid >= final_amount {
            prop_assert_eq!(status, PaymentStatus::Paid);
        } else if paid > Decimal::ZERO {
            prop_assert_eq!(status, PaymentStatus::Partial);
        } else {
            prop_assert_eq!(status, PaymentStatus::Pending);
        }
    }

    #[test]
    fn quotes_are_always_consistent(
        base in cents_strategy(),
        cash_pct in pct_strategy(),
        promo_pct in pct_strategy(),
        extra in cents_strategy(),
        cash in any::<bool>(),
    ) {
        let modality = if cash { PaymentModality::Cash } else { PaymentModality::Installments };
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        match quote_enrollment(&program(base, cash_pct, promo_pct), modality, extra, today) {
            Ok(quote) => {
                prop_assert_eq!(quote.final_amount, quote.total_amount - quote.discount_amount);
                prop_assert!(quote.final_amount >= Decimal::ZERO);
                prop_assert!(quote.discount_amount >= extra);
            }
            Err(_) => prop_assert!(extra > Decimal::ZERO),
        }
    }

    #[test]
    fn invoice_totals_add_up(subtotal in cents_strategy(), vat in any::<bool>(), tt in any::<bool>()) {
        let rates = InvoiceRates { vat: dec!(0.13), transaction_tax: dec!(0.03) };
        let totals = InvoiceTotals::compute(subtotal, vat, tt, rates);
        prop_assert_eq!(
            totals.total,
            totals.subtotal + totals.vat_amount + totals.transaction_tax_amount
        );
        prop_assert!(totals.vat_amount.scale() <= 2);
        prop_assert!(totals.transaction_tax_amount.scale() <= 2);
        if !vat {
            prop_assert_eq!(totals.vat_amount, Decimal::ZERO);
        }
    }

    #[test]
    fn extensions_parse_regardless_of_case(
        name in "[a-z]{1,12}",
        ext in prop_oneof!["pdf", "PDF", "Jpg", "jpeg", "png", "TIF", "tiff", "docx", "xls"],
    ) {
        let path = format!("{}.{}", name, ext);
        prop_assert!(FileExtension::from_path(&path).is_some());
    }
}
