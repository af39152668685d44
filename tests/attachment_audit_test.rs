mod common;

use assert_matches::assert_matches;
use campus_ledger::errors::ServiceError;
use campus_ledger::models::catalogs::{AuditAction, DocumentType, FileExtension, OriginType};
use campus_ledger::services::attachments::NewAttachment;
use campus_ledger::services::audit::{verify_integrity, NewAuditEntry};
use common::{installment_income, rent_expense, TestContext};
use rust_decimal_macros::dec;
use serde_json::json;

fn receipt_for(origin_type: OriginType, origin_id: i32, uploaded_by: i32) -> NewAttachment {
    NewAttachment {
        origin_type,
        origin_id,
        document_type: DocumentType::Receipt,
        original_name: "receipt-scan.JPG".to_string(),
        file_path: None,
        uploaded_by,
    }
}

#[tokio::test]
async fn scenario_f_attachment_to_missing_income_is_a_dangling_reference() {
    let ctx = TestContext::new().await;

    let err = ctx
        .services
        .attachments
        .attach_document(receipt_for(OriginType::Income, 999, ctx.cashier.id))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ReferenceError(_));
    assert!(ctx
        .services
        .attachments
        .attachments_for(OriginType::Income, 999)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn attachment_is_filed_under_its_origin() {
    let ctx = TestContext::new().await;
    let expense = ctx
        .services
        .ledger
        .record_expense(rent_expense(dec!(250), ctx.cashier.id))
        .await
        .expect("record expense");

    let attached = ctx
        .services
        .attachments
        .attach_document(receipt_for(OriginType::Expense, expense.id, ctx.cashier.id))
        .await
        .expect("attach");

    assert_eq!(attached.extension, FileExtension::Jpeg);
    assert_eq!(
        attached.file_path,
        format!(
            "/var/lib/campus-ledger/attachments/expense/{}/receipt-scan.JPG",
            expense.id
        )
    );
    assert_eq!(
        ctx.services
            .attachments
            .attachments_for(OriginType::Expense, expense.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn second_attachment_of_the_same_type_is_a_duplicate() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;
    let income = ctx
        .services
        .ledger
        .record_income(installment_income(enrollment.id, dec!(100), "R-4001", ctx.cashier.id))
        .await
        .expect("record income");
    let attachments = &ctx.services.attachments;

    attachments
        .attach_document(receipt_for(OriginType::Income, income.id, ctx.cashier.id))
        .await
        .expect("first receipt");

    assert_matches!(
        attachments
            .attach_document(receipt_for(OriginType::Income, income.id, ctx.cashier.id))
            .await,
        Err(ServiceError::DuplicateError(_))
    );

    let mut voucher = receipt_for(OriginType::Income, income.id, ctx.cashier.id);
    voucher.document_type = DocumentType::BankVoucher;
    voucher.original_name = "voucher.pdf".to_string();
    attachments
        .attach_document(voucher)
        .await
        .expect("different document type");

    assert_eq!(
        attachments
            .attachments_for(OriginType::Income, income.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let ctx = TestContext::new().await;
    let expense = ctx
        .services
        .ledger
        .record_expense(rent_expense(dec!(90), ctx.cashier.id))
        .await
        .expect("record expense");

    let mut input = receipt_for(OriginType::Expense, expense.id, ctx.cashier.id);
    input.original_name = "receipt.exe".to_string();

    assert_matches!(
        ctx.services.attachments.attach_document(input).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn audit_entries_are_sealed_with_an_integrity_hash() {
    let ctx = TestContext::new().await;
    let expense = ctx
        .services
        .ledger
        .record_expense(rent_expense(dec!(250), ctx.cashier.id))
        .await
        .expect("record expense");

    let entry = ctx
        .services
        .audit
        .record_audit(NewAuditEntry {
            user_id: ctx.cashier.id,
            origin_type: OriginType::Expense,
            origin_id: expense.id,
            action: AuditAction::Modify,
            reason: "Supplier name corrected".to_string(),
            previous_values: Some(json!({ "supplier": "Edificio Central" })),
            new_values: Some(json!({ "supplier": "Edificio Central SRL" })),
        })
        .await
        .expect("record audit");

    assert_eq!(entry.integrity_hash.len(), 64);
    let trail = ctx
        .services
        .audit
        .entries_for(OriginType::Expense, expense.id)
        .await
        .expect("audit trail");
    assert_eq!(trail.len(), 1);
    assert!(verify_integrity(&trail[0]));
}

#[tokio::test]
async fn audit_requires_reason_and_existing_origin() {
    let ctx = TestContext::new().await;
    let audit = &ctx.services.audit;

    let missing_origin = NewAuditEntry {
        user_id: ctx.cashier.id,
        origin_type: OriginType::Income,
        origin_id: 31337,
        action: AuditAction::Delete,
        reason: "Entered twice".to_string(),
        previous_values: None,
        new_values: None,
    };
    assert_matches!(
        audit.record_audit(missing_origin.clone()).await,
        Err(ServiceError::ReferenceError(_))
    );

    let expense = ctx
        .services
        .ledger
        .record_expense(rent_expense(dec!(40), ctx.cashier.id))
        .await
        .expect("record expense");
    let blank_reason = NewAuditEntry {
        origin_type: OriginType::Expense,
        origin_id: expense.id,
        reason: "   ".to_string(),
        ..missing_origin
    };
    assert_matches!(
        audit.record_audit(blank_reason).await,
        Err(ServiceError::ValidationError(_))
    );
}
