use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(32).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(Users::FullName).string_len(150).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(120).null())
                    .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Students::DocumentNumber)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Students::IssuancePlace)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Students::FirstNames).string_len(100).not_null())
                    .col(ColumnDef::new(Students::LastNames).string_len(100).not_null())
                    .col(ColumnDef::new(Students::BirthDate).date().null())
                    .col(ColumnDef::new(Students::Phone).string_len(20).null())
                    .col(ColumnDef::new(Students::Email).string_len(120).null())
                    .col(ColumnDef::new(Students::AlmaMater).string_len(150).null())
                    .col(ColumnDef::new(Students::Profession).string_len(100).null())
                    .col(ColumnDef::new(Students::PhotoPath).string_len(255).null())
                    .col(
                        ColumnDef::new(Students::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Students::RegisteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_students_document_number")
                    .table(Students::Table)
                    .col(Students::DocumentNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Instructors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Instructors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Instructors::DocumentNumber)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Instructors::IssuancePlace)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Instructors::FirstNames)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Instructors::LastNames)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Instructors::BirthDate).date().null())
                    .col(ColumnDef::new(Instructors::Phone).string_len(20).null())
                    .col(ColumnDef::new(Instructors::Email).string_len(120).null())
                    .col(ColumnDef::new(Instructors::AcademicDegree).string_len(32).null())
                    .col(ColumnDef::new(Instructors::Specialty).string_len(150).null())
                    .col(ColumnDef::new(Instructors::CvPath).string_len(255).null())
                    .col(
                        ColumnDef::new(Instructors::HourlyFee)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0)
                            .check(Expr::col(Instructors::HourlyFee).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Instructors::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Instructors::RegisteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_instructors_document_number")
                    .table(Instructors::Table)
                    .col(Instructors::DocumentNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Instructors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    FullName,
    Email,
    Role,
    Active,
    LastLogin,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Students {
    Table,
    Id,
    DocumentNumber,
    IssuancePlace,
    FirstNames,
    LastNames,
    BirthDate,
    Phone,
    Email,
    AlmaMater,
    Profession,
    PhotoPath,
    Active,
    RegisteredAt,
}

#[derive(DeriveIden)]
pub enum Instructors {
    Table,
    Id,
    DocumentNumber,
    IssuancePlace,
    FirstNames,
    LastNames,
    BirthDate,
    Phone,
    Email,
    AcademicDegree,
    Specialty,
    CvPath,
    HourlyFee,
    Active,
    RegisteredAt,
}
