//! Campus Ledger
//!
//! Enrollment, billing and cash ledger core for an educational institution:
//! party and program registries, seat-controlled enrollments with their
//! installment schedules, financial event propagation into enrollment
//! balances and the cash ledger, document attachments, audit trail, invoices
//! and a process-wide settings store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod models;
pub mod services;

pub use errors::{ServiceError, ServiceResult};
pub use services::factory::{ServiceContainer, ServiceFactory};
