use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_party_tables::Users;
use super::m20250301_000003_create_enrollments_table::Enrollments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Incomes
        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Incomes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Incomes::IncomeType).string_len(32).not_null())
                    .col(ColumnDef::new(Incomes::EnrollmentId).integer().null())
                    .col(ColumnDef::new(Incomes::InstallmentNumber).integer().null())
                    .col(ColumnDef::new(Incomes::IncomeDate).date().not_null())
                    .col(
                        ColumnDef::new(Incomes::Amount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Incomes::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(Incomes::Concept).string_len(200).not_null())
                    .col(ColumnDef::new(Incomes::Description).text().null())
                    .col(ColumnDef::new(Incomes::PaymentMethod).string_len(32).not_null())
                    .col(ColumnDef::new(Incomes::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Incomes::ReceiptNumber).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Incomes::TransactionReference)
                            .string_len(100)
                            .null(),
                    )
                    .col(ColumnDef::new(Incomes::RecordedBy).integer().not_null())
                    .col(
                        ColumnDef::new(Incomes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incomes_enrollment_id")
                            .from(Incomes::Table, Incomes::EnrollmentId)
                            .to(Enrollments::Table, Enrollments::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incomes_recorded_by")
                            .from(Incomes::Table, Incomes::RecordedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_incomes_receipt_number")
                    .table(Incomes::Table)
                    .col(Incomes::ReceiptNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incomes_enrollment_id")
                    .table(Incomes::Table)
                    .col(Incomes::EnrollmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incomes_income_date")
                    .table(Incomes::Table)
                    .col(Incomes::IncomeDate)
                    .to_owned(),
            )
            .await?;

        // Expenses
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                    .col(
                        ColumnDef::new(Expenses::Amount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Expenses::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(Expenses::Category).string_len(50).not_null())
                    .col(ColumnDef::new(Expenses::Subcategory).string_len(100).null())
                    .col(ColumnDef::new(Expenses::Description).text().not_null())
                    .col(ColumnDef::new(Expenses::Supplier).string_len(200).null())
                    .col(
                        ColumnDef::new(Expenses::SupplierInvoiceNumber)
                            .string_len(50)
                            .null(),
                    )
                    .col(ColumnDef::new(Expenses::PaymentMethod).string_len(32).not_null())
                    .col(ColumnDef::new(Expenses::ReceiptNumber).string_len(50).null())
                    .col(ColumnDef::new(Expenses::RecordedBy).integer().not_null())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_recorded_by")
                            .from(Expenses::Table, Expenses::RecordedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_expense_date")
                    .table(Expenses::Table)
                    .col(Expenses::ExpenseDate)
                    .to_owned(),
            )
            .await?;

        // Attachments
        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attachments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attachments::OriginType).string_len(32).not_null())
                    .col(ColumnDef::new(Attachments::OriginId).integer().not_null())
                    .col(
                        ColumnDef::new(Attachments::DocumentType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attachments::FilePath).string_len(500).not_null())
                    .col(
                        ColumnDef::new(Attachments::OriginalName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attachments::Extension).string_len(32).not_null())
                    .col(ColumnDef::new(Attachments::UploadedBy).integer().not_null())
                    .col(
                        ColumnDef::new(Attachments::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_uploaded_by")
                            .from(Attachments::Table, Attachments::UploadedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_attachments_origin_document")
                    .table(Attachments::Table)
                    .col(Attachments::OriginType)
                    .col(Attachments::OriginId)
                    .col(Attachments::DocumentType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Cash movements
        manager
            .create_table(
                Table::create()
                    .table(CashMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashMovements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CashMovements::MovementType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CashMovements::Amount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(CashMovements::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(CashMovements::MovementDate).date().not_null())
                    .col(ColumnDef::new(CashMovements::Description).text().not_null())
                    .col(ColumnDef::new(CashMovements::OriginType).string_len(32).null())
                    .col(ColumnDef::new(CashMovements::OriginId).integer().null())
                    .col(
                        ColumnDef::new(CashMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_cash_movements_origin")
                    .table(CashMovements::Table)
                    .col(CashMovements::OriginType)
                    .col(CashMovements::OriginId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cash_movements_movement_date")
                    .table(CashMovements::Table)
                    .col(CashMovements::MovementDate)
                    .to_owned(),
            )
            .await?;

        // Invoices
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceNumber).string_len(50).not_null())
                    .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::CustomerTaxId).string_len(20).null())
                    .col(ColumnDef::new(Invoices::BusinessName).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Invoices::Subtotal)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Invoices::Subtotal).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Invoices::VatAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Invoices::TransactionTaxAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Invoices::Total).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Invoices::Concept).text().not_null())
                    .col(ColumnDef::new(Invoices::Status).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Invoices::Exported)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_invoices_invoice_number")
                    .table(Invoices::Table)
                    .col(Invoices::InvoiceNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Audit trail
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AuditEntries::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditEntries::UserId).integer().not_null())
                    .col(ColumnDef::new(AuditEntries::OriginType).string_len(32).not_null())
                    .col(ColumnDef::new(AuditEntries::OriginId).integer().not_null())
                    .col(ColumnDef::new(AuditEntries::Action).string_len(32).not_null())
                    .col(ColumnDef::new(AuditEntries::Reason).text().not_null())
                    .col(ColumnDef::new(AuditEntries::PreviousValues).json().null())
                    .col(ColumnDef::new(AuditEntries::NewValues).json().null())
                    .col(
                        ColumnDef::new(AuditEntries::IntegrityHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_entries_user_id")
                            .from(AuditEntries::Table, AuditEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_entries_origin")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::OriginType)
                    .col(AuditEntries::OriginId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Incomes {
    Table,
    Id,
    IncomeType,
    EnrollmentId,
    InstallmentNumber,
    IncomeDate,
    Amount,
    Concept,
    Description,
    PaymentMethod,
    Status,
    ReceiptNumber,
    TransactionReference,
    RecordedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Expenses {
    Table,
    Id,
    ExpenseDate,
    Amount,
    Category,
    Subcategory,
    Description,
    Supplier,
    SupplierInvoiceNumber,
    PaymentMethod,
    ReceiptNumber,
    RecordedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Attachments {
    Table,
    Id,
    OriginType,
    OriginId,
    DocumentType,
    FilePath,
    OriginalName,
    Extension,
    UploadedBy,
    UploadedAt,
}

#[derive(DeriveIden)]
pub enum CashMovements {
    Table,
    Id,
    MovementType,
    Amount,
    MovementDate,
    Description,
    OriginType,
    OriginId,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    IssueDate,
    CustomerTaxId,
    BusinessName,
    Subtotal,
    VatAmount,
    TransactionTaxAmount,
    Total,
    Concept,
    Status,
    Exported,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum AuditEntries {
    Table,
    Id,
    OccurredAt,
    UserId,
    OriginType,
    OriginId,
    Action,
    Reason,
    PreviousValues,
    NewValues,
    IntegrityHash,
}
