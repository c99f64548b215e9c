//! Invoice aggregate
//!
//! The invoice is the consistency boundary of the engine. Its monetary
//! aggregates are always produced by the totals calculator, its number is a
//! placeholder until issuance, and its four issuance snapshots are written
//! exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! DRAFT ──issue──▶ SENT ──▶ {VIEWED, PARTIAL, PAID, OVERDUE} ──▶ PAID
//!   │                │
//!   └────cancel──────┴──▶ CANCELED
//! ```
//!
//! Only `CANCELED` is set directly by callers; the other post-issuance states
//! are derived by [`derive_status`] from payments and the due date.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    ClientId, Currency, InvoiceId, InvoiceLineId, IssuerId, Money, MoneyError, PaymentId,
    ProviderId, ProviderOrderId, SaleId,
};

use crate::payment::InvoicePayment;
use crate::snapshot::{CompanySnapshot, CounterpartySnapshot, LineSnapshot, TotalsSnapshot};
use crate::totals::{ComputedLine, InvoiceTotals, LineSpec, PricingMode};

/// Number held by every draft; not unique
pub const DRAFT_NUMBER_PLACEHOLDER: &str = "DRAFT";

/// Invoice direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Issued to a client
    Customer,
    /// Received from a provider
    Vendor,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Customer => "CUSTOMER",
            InvoiceType::Vendor => "VENDOR",
        }
    }
}

impl FromStr for InvoiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(InvoiceType::Customer),
            "VENDOR" => Ok(InvoiceType::Vendor),
            other => Err(format!("Unknown invoice type: {}", other)),
        }
    }
}

/// Persisted lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Partial,
    Paid,
    Overdue,
    Canceled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Viewed => "VIEWED",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Canceled => "CANCELED",
        }
    }

    /// `PAID` and `CANCELED` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Canceled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "SENT" => Ok(InvoiceStatus::Sent),
            "VIEWED" => Ok(InvoiceStatus::Viewed),
            "PARTIAL" => Ok(InvoiceStatus::Partial),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            "CANCELED" => Ok(InvoiceStatus::Canceled),
            other => Err(format!("Unknown invoice status: {}", other)),
        }
    }
}

/// The other party of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Counterparty {
    Client(ClientId),
    Provider(ProviderId),
}

/// The document an invoice was generated from; at most one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InvoiceOrigin {
    #[default]
    None,
    FromSale(SaleId),
    FromProviderOrder(ProviderOrderId),
    FromPayment(PaymentId),
}

/// Kind of corrective invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RectificationType {
    /// Negates every line of the original
    Total,
    /// Starts from a zero-valued placeholder line for manual completion
    Partial,
}

impl RectificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RectificationType::Total => "TOTAL",
            RectificationType::Partial => "PARTIAL",
        }
    }
}

/// Link from a rectification to the invoice it corrects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectificationLink {
    pub rectifies_invoice_id: InvoiceId,
    pub rectifies_number: String,
    pub reason: String,
    pub kind: RectificationType,
}

/// A persisted invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: InvoiceLineId,
    pub position: u32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub tax_percent: Decimal,
    pub pricing_mode: PricingMode,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceLine {
    pub fn from_computed(position: u32, line: ComputedLine) -> Self {
        Self {
            id: InvoiceLineId::new_v7(),
            position,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            tax_percent: line.tax_percent,
            pricing_mode: line.pricing_mode,
            subtotal: line.subtotal,
            tax_amount: line.tax_amount,
            total: line.total,
        }
    }

    /// Reconstructs the entry that produces this line
    pub fn to_spec(&self) -> LineSpec {
        LineSpec {
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            line_total: match self.pricing_mode {
                PricingMode::Total => Some(self.total),
                PricingMode::Base => None,
            },
            tax_percent: self.tax_percent,
            discount_percent: self.discount_percent,
            pricing_mode: Some(self.pricing_mode),
        }
    }

    pub fn to_snapshot(&self) -> LineSnapshot {
        LineSnapshot {
            position: self.position,
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_percent: self.tax_percent,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }
}

/// The invoice aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub issuer_id: IssuerId,
    pub invoice_type: InvoiceType,
    /// Placeholder while draft; immutable once issued
    pub number: String,
    pub series: String,
    /// Allocated sequence value, set at issuance
    pub sequence: Option<i64>,
    pub counterparty: Option<Counterparty>,
    pub origin: InvoiceOrigin,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub currency: Currency,
    pub pricing_mode: PricingMode,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub rectification: Option<RectificationLink>,
    pub company_snapshot: Option<CompanySnapshot>,
    pub counterparty_snapshot: Option<CounterpartySnapshot>,
    pub items_snapshot: Option<Vec<LineSnapshot>>,
    pub totals_snapshot: Option<TotalsSnapshot>,
    pub lines: Vec<InvoiceLine>,
    pub payments: Vec<InvoicePayment>,
    /// Optimistic concurrency token, bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// True once a legal number has been assigned
    pub fn is_issued(&self) -> bool {
        self.issued_at.is_some()
    }

    pub fn is_rectification(&self) -> bool {
        self.rectification.is_some()
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// Replaces all lines and the aggregates derived from them
    pub fn replace_lines(&mut self, lines: Vec<ComputedLine>, totals: InvoiceTotals) {
        self.lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| InvoiceLine::from_computed(i as u32 + 1, line))
            .collect();
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
    }

    /// Sum of all recorded payments
    pub fn amount_paid(&self) -> Result<Money, MoneyError> {
        let amounts: Vec<Money> = self.payments.iter().map(|p| p.amount).collect();
        Money::sum(self.currency, &amounts)
    }

    /// `total - sum(payments)`
    pub fn balance_due(&self) -> Result<Money, MoneyError> {
        Money::new(self.total, self.currency).checked_sub(&self.amount_paid()?)
    }

    /// Timestamp of the most recent payment
    pub fn last_payment_at(&self) -> Option<DateTime<Utc>> {
        self.payments.iter().map(|p| p.paid_at).max()
    }
}

/// Outcome of [`derive_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDerivation {
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Derives the lifecycle status from payment and due-date facts
///
/// Rules, first match wins:
/// 1. `CANCELED` stays `CANCELED`
/// 2. `sum(payments) >= total` and `total > 0` gives `PAID`, stamped with the
///    most recent payment
/// 3. `sum(payments) > 0` gives `PARTIAL`
/// 4. `today > due_date` gives `OVERDUE`
/// 5. otherwise the status is unchanged
pub fn derive_status(
    current: InvoiceStatus,
    total: Decimal,
    paid: Decimal,
    last_payment_at: Option<DateTime<Utc>>,
    current_paid_at: Option<DateTime<Utc>>,
    due_date: NaiveDate,
    today: NaiveDate,
) -> StatusDerivation {
    if current == InvoiceStatus::Canceled {
        return StatusDerivation { status: current, paid_at: current_paid_at };
    }
    if total > Decimal::ZERO && paid >= total {
        return StatusDerivation {
            status: InvoiceStatus::Paid,
            paid_at: last_payment_at.or(current_paid_at),
        };
    }
    if paid > Decimal::ZERO {
        return StatusDerivation { status: InvoiceStatus::Partial, paid_at: current_paid_at };
    }
    if today > due_date {
        return StatusDerivation { status: InvoiceStatus::Overdue, paid_at: current_paid_at };
    }
    StatusDerivation { status: current, paid_at: current_paid_at }
}

/// Applies [`derive_status`] to an invoice's own facts
pub fn recompute_status(invoice: &Invoice, today: NaiveDate) -> Result<StatusDerivation, MoneyError> {
    let paid = invoice.amount_paid()?;
    Ok(derive_status(
        invoice.status,
        invoice.total,
        paid.amount(),
        invoice.last_payment_at(),
        invoice.paid_at,
        invoice.due_date,
        today,
    ))
}
