use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_enrollments_table::Enrollments;
use super::m20250301_000004_create_financial_tables::Incomes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Installments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Installments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Installments::EnrollmentId).integer().not_null())
                    .col(
                        ColumnDef::new(Installments::Number)
                            .integer()
                            .not_null()
                            .check(Expr::col(Installments::Number).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Installments::Amount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Installments::Amount).gte(0)),
                    )
                    .col(ColumnDef::new(Installments::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Installments::Status)
                            .string_len(32)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Installments::PaidOn).date().null())
                    .col(ColumnDef::new(Installments::IncomeId).integer().null())
                    .col(
                        ColumnDef::new(Installments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Installments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installments_enrollment_id")
                            .from(Installments::Table, Installments::EnrollmentId)
                            .to(Enrollments::Table, Enrollments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installments_income_id")
                            .from(Installments::Table, Installments::IncomeId)
                            .to(Incomes::Table, Incomes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_installments_enrollment_number")
                    .table(Installments::Table)
                    .col(Installments::EnrollmentId)
                    .col(Installments::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_installments_status_due_date")
                    .table(Installments::Table)
                    .col(Installments::Status)
                    .col(Installments::DueDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Installments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Installments {
    Table,
    Id,
    EnrollmentId,
    Number,
    Amount,
    DueDate,
    Status,
    PaidOn,
    IncomeId,
    CreatedAt,
    UpdatedAt,
}
