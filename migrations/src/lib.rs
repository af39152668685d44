pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_party_tables;
mod m20250301_000002_create_program_tables;
mod m20250301_000003_create_enrollments_table;
mod m20250301_000004_create_financial_tables;
mod m20250301_000005_create_system_config_table;
mod m20250301_000006_create_installments_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_party_tables::Migration),
            Box::new(m20250301_000002_create_program_tables::Migration),
            Box::new(m20250301_000003_create_enrollments_table::Migration),
            Box::new(m20250301_000004_create_financial_tables::Migration),
            Box::new(m20250301_000005_create_system_config_table::Migration),
            Box::new(m20250301_000006_create_installments_table::Migration),
        ]
    }
}
