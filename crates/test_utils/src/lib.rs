//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! invoicing engine test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built counterparties, branding profiles and dates
//! - `builders`: Builder for draft specifications
//! - `harness`: An `InvoiceService` and `ReminderService` wired over the
//!   in-memory adapters with a controllable clock
//! - `assertions`: Invariant checks for invoices and numbering
//! - `generators`: Property-based line generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
