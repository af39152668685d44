use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_party_tables::Instructors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AcademicPrograms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AcademicPrograms::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AcademicPrograms::Code).string_len(20).not_null())
                    .col(ColumnDef::new(AcademicPrograms::Name).string_len(200).not_null())
                    .col(ColumnDef::new(AcademicPrograms::Description).text().null())
                    .col(ColumnDef::new(AcademicPrograms::DurationWeeks).integer().null())
                    .col(ColumnDef::new(AcademicPrograms::TotalHours).integer().null())
                    .col(
                        ColumnDef::new(AcademicPrograms::BaseCost)
                            .decimal_len(12, 2)
                            .not_null()
                            .check(Expr::col(AcademicPrograms::BaseCost).gte(0)),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::CashDiscountPct)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::TotalSeats)
                            .integer()
                            .not_null()
                            .check(Expr::col(AcademicPrograms::TotalSeats).gte(0)),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::AvailableSeats)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AcademicPrograms::PlannedStart).date().null())
                    .col(ColumnDef::new(AcademicPrograms::PlannedEnd).date().null())
                    .col(ColumnDef::new(AcademicPrograms::ActualStart).date().null())
                    .col(ColumnDef::new(AcademicPrograms::ActualEnd).date().null())
                    .col(ColumnDef::new(AcademicPrograms::TutorId).integer().null())
                    .col(
                        ColumnDef::new(AcademicPrograms::PromotionActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::PromotionDescription)
                            .string_len(200)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::PromotionDiscountPct)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AcademicPrograms::PromotionDeadline).date().null())
                    .col(
                        ColumnDef::new(AcademicPrograms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AcademicPrograms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(
                        Expr::col(AcademicPrograms::AvailableSeats)
                            .gte(0)
                            .and(
                                Expr::col(AcademicPrograms::AvailableSeats)
                                    .lte(Expr::col(AcademicPrograms::TotalSeats)),
                            ),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_academic_programs_tutor_id")
                            .from(AcademicPrograms::Table, AcademicPrograms::TutorId)
                            .to(Instructors::Table, Instructors::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_academic_programs_code")
                    .table(AcademicPrograms::Table)
                    .col(AcademicPrograms::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentPlans::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentPlans::ProgramId).integer().not_null())
                    .col(ColumnDef::new(PaymentPlans::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(PaymentPlans::InstallmentCount)
                            .integer()
                            .not_null()
                            .check(Expr::col(PaymentPlans::InstallmentCount).gt(0)),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::IntervalDays)
                            .integer()
                            .not_null()
                            .check(Expr::col(PaymentPlans::IntervalDays).gt(0)),
                    )
                    .col(ColumnDef::new(PaymentPlans::Description).text().null())
                    .col(
                        ColumnDef::new(PaymentPlans::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_plans_program_id")
                            .from(PaymentPlans::Table, PaymentPlans::ProgramId)
                            .to(AcademicPrograms::Table, AcademicPrograms::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_payment_plans_program_name")
                    .table(PaymentPlans::Table)
                    .col(PaymentPlans::ProgramId)
                    .col(PaymentPlans::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AcademicPrograms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum AcademicPrograms {
    Table,
    Id,
    Code,
    Name,
    Description,
    DurationWeeks,
    TotalHours,
    BaseCost,
    CashDiscountPct,
    TotalSeats,
    AvailableSeats,
    Status,
    PlannedStart,
    PlannedEnd,
    ActualStart,
    ActualEnd,
    TutorId,
    PromotionActive,
    PromotionDescription,
    PromotionDiscountPct,
    PromotionDeadline,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PaymentPlans {
    Table,
    Id,
    ProgramId,
    Name,
    InstallmentCount,
    IntervalDays,
    Description,
    Active,
    CreatedAt,
}
