//! Core Kernel - Foundational types for the invoicing engine
//!
//! This crate provides the building blocks shared by the domain, persistence and
//! API crates:
//! - Money with exact decimal arithmetic and half-up rounding
//! - Calendar-day time handling (clocks, issuer timezones)
//! - Strongly-typed identifiers
//! - Port/adapter infrastructure for external collaborators

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate, round2, round_half_up};
pub use temporal::{Clock, SystemClock, FixedClock, Timezone, calendar_days_between};
pub use identifiers::{
    InvoiceId, InvoiceLineId, PaymentId, InvoiceEventId, IssuerId,
    ClientId, ProviderId, SaleId, ProviderOrderId, ReminderLogId,
};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
