// Shared field rules
pub mod validation;

// Write-conflict retry policy
pub mod retry;

// Service factory for dependency injection
pub mod factory;

// Registries and catalogs
pub mod parties;
pub mod programs;

// Enrollment and financial ledger
pub mod enrollments;
pub mod ledger;

// Supporting records
pub mod attachments;
pub mod audit;
pub mod invoices;

// Configuration store
pub mod settings;

// Reporting
pub mod reports;
