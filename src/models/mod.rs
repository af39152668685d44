//! SeaORM entities, one per persisted table, plus the closed value catalogs.

pub mod academic_program;
pub mod attachment;
pub mod audit_entry;
pub mod cash_movement;
pub mod catalogs;
pub mod enrollment;
pub mod expense;
pub mod income;
pub mod installment;
pub mod instructor;
pub mod invoice;
pub mod payment_plan;
pub mod student;
pub mod system_config;
pub mod user;
