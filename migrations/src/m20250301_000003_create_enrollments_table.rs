use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_party_tables::{Students, Users};
use super::m20250301_000002_create_program_tables::{AcademicPrograms, PaymentPlans};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Enrollments::StudentId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::ProgramId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::Modality).string_len(32).not_null())
                    .col(ColumnDef::new(Enrollments::PaymentPlanId).integer().null())
                    .col(
                        ColumnDef::new(Enrollments::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Enrollments::TotalAmount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Enrollments::DiscountAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0)
                            .check(Expr::col(Enrollments::DiscountAmount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Enrollments::FinalAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(Enrollments::FinalAmount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Enrollments::PaidAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0)
                            .check(Expr::col(Enrollments::PaidAmount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Enrollments::PaymentStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::AcademicStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Enrollments::CoordinatorId).integer().null())
                    .col(ColumnDef::new(Enrollments::Notes).text().null())
                    .col(
                        ColumnDef::new(Enrollments::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Enrollments::EnrolledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Enrollments::PaidAmount).lte(Expr::col(Enrollments::FinalAmount)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_student_id")
                            .from(Enrollments::Table, Enrollments::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_program_id")
                            .from(Enrollments::Table, Enrollments::ProgramId)
                            .to(AcademicPrograms::Table, AcademicPrograms::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_payment_plan_id")
                            .from(Enrollments::Table, Enrollments::PaymentPlanId)
                            .to(PaymentPlans::Table, PaymentPlans::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_coordinator_id")
                            .from(Enrollments::Table, Enrollments::CoordinatorId)
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
                    .name("uq_enrollments_student_program")
                    .table(Enrollments::Table)
                    .col(Enrollments::StudentId)
                    .col(Enrollments::ProgramId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_program_id")
                    .table(Enrollments::Table)
                    .col(Enrollments::ProgramId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Enrollments {
    Table,
    Id,
    StudentId,
    ProgramId,
    Modality,
    PaymentPlanId,
    TotalAmount,
    DiscountAmount,
    FinalAmount,
    PaidAmount,
    PaymentStatus,
    AcademicStatus,
    CoordinatorId,
    Notes,
    Version,
    EnrolledAt,
    UpdatedAt,
}
