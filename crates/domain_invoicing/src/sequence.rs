//! Legal invoice numbering
//!
//! Numbers are allocated from a per (issuer, series, year) counter and
//! formatted as `YYYY-XXXX`. The counter itself lives in the invoice store,
//! because allocation must commit or roll back together with the invoice
//! update that consumes it; this module holds the keys, the formatting and
//! the counter table used by in-process stores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use core_kernel::IssuerId;

use crate::invoice::InvoiceType;

/// Series used for customer invoices
pub const CUSTOMER_SERIES: &str = "INV";
/// Series used for vendor invoices
pub const VENDOR_SERIES: &str = "PRV";
/// Series used for rectifications
pub const RECTIFICATION_SERIES: &str = "RECT";

/// Default series for a new invoice
pub fn default_series(invoice_type: InvoiceType, is_rectification: bool) -> &'static str {
    if is_rectification {
        return RECTIFICATION_SERIES;
    }
    match invoice_type {
        InvoiceType::Customer => CUSTOMER_SERIES,
        InvoiceType::Vendor => VENDOR_SERIES,
    }
}

/// Identifies one numbering stream, e.g. `INV-2026`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub series: String,
    pub year: i32,
}

impl SeriesKey {
    pub fn new(series: impl Into<String>, year: i32) -> Self {
        Self {
            series: series.into(),
            year,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.series, self.year)
    }
}

/// Formats an allocated sequence value as `YYYY-XXXX`
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("{:04}-{:04}", year, sequence)
}

/// A number handed out by the allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedNumber {
    pub key: SeriesKey,
    pub sequence: i64,
    pub formatted: String,
}

impl AllocatedNumber {
    pub fn new(key: SeriesKey, sequence: i64) -> Self {
        let formatted = format_invoice_number(key.year, sequence);
        Self { key, sequence, formatted }
    }
}

/// Counter table keyed by (issuer, series key)
///
/// Holds the next value to hand out. Callers that need all-or-nothing
/// semantics clone the table, allocate on the clone, and swap it in only
/// once the rest of their write has succeeded.
#[derive(Debug, Clone, Default)]
pub struct SeriesCounters {
    next: HashMap<(IssuerId, String), i64>,
}

impl SeriesCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value and advances the counter
    pub fn consume_next(&mut self, issuer_id: IssuerId, key: &SeriesKey) -> AllocatedNumber {
        let slot = self.next.entry((issuer_id, key.to_string())).or_insert(1);
        let sequence = *slot;
        *slot += 1;
        AllocatedNumber::new(key.clone(), sequence)
    }

    /// Value the next allocation would return
    pub fn peek(&self, issuer_id: IssuerId, key: &SeriesKey) -> i64 {
        self.next.get(&(issuer_id, key.to_string())).copied().unwrap_or(1)
    }
}
