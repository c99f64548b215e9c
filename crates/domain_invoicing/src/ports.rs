//! Invoicing Domain Ports
//!
//! The lifecycle and reminder services reach every collaborator through the
//! traits in this module:
//!
//! - [`InvoiceStore`]: invoices, lines, payments, events and the series
//!   counters, with issuance committed as one atomic unit
//! - [`ReminderLog`]: idempotency ledger for reminder sends
//! - [`CounterpartyDirectory`] and [`BrandingProvider`]: live fiscal data used
//!   for eligibility checks and issuance snapshots
//! - [`Notifier`]: outbound reminder delivery
//! - [`DocumentRenderer`] and [`DocumentStore`]: document generation
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = InvoiceService::new(
//!     Arc::new(PostgresInvoiceStore::new(pool.clone())),
//!     Arc::new(PostgresCounterpartyDirectory::new(pool.clone())),
//!     Arc::new(PostgresBrandingProvider::new(pool.clone())),
//!     documents,
//!     Arc::new(SystemClock),
//!     InvoicingSettings::default(),
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{DomainPort, HealthCheckable, InvoiceId, IssuerId, PortError};

use crate::document::DocumentModel;
use crate::events::InvoiceEvent;
use crate::invoice::{Counterparty, Invoice, InvoiceStatus, InvoiceType};
use crate::reminders::ReminderLogEntry;
use crate::sequence::{AllocatedNumber, SeriesKey};

// ============================================================================
// Collaborator data
// ============================================================================

/// Live fiscal data of a client or provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyRecord {
    pub name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
}

/// Issuer branding and fiscal profile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrandingProfile {
    pub company_name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub legal_footer: Option<String>,
    pub payment_conditions: Option<String>,
    pub logo_url: Option<String>,
    pub default_notes_template: Option<String>,
    pub default_terms_template: Option<String>,
}

/// Delivery channel for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
}

/// An outbound message handed to the notification boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub template: String,
    pub data: Value,
}

/// A rendered document artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub invoice_id: InvoiceId,
    pub issuer_id: IssuerId,
    /// Invoice number printed on the document
    pub number: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Invoice store
// ============================================================================

/// Filters for listing invoices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub invoice_type: Option<InvoiceType>,
    pub counterparty: Option<Counterparty>,
    pub issued_from: Option<NaiveDate>,
    pub issued_to: Option<NaiveDate>,
    /// Case-insensitive match on number or notes
    pub search: Option<String>,
    pub rectifications_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl InvoiceQuery {
    pub fn by_status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Applies every filter except pagination to an in-memory invoice
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if self.status.is_some_and(|s| s != invoice.status) {
            return false;
        }
        if self.invoice_type.is_some_and(|t| t != invoice.invoice_type) {
            return false;
        }
        if self.counterparty.is_some() && self.counterparty != invoice.counterparty {
            return false;
        }
        if self.issued_from.is_some_and(|from| invoice.issue_date < from) {
            return false;
        }
        if self.issued_to.is_some_and(|to| invoice.issue_date > to) {
            return false;
        }
        if self.rectifications_only && !invoice.is_rectification() {
            return false;
        }
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let in_number = invoice.number.to_lowercase().contains(&term);
            let in_notes = invoice
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&term));
            if !in_number && !in_notes {
                return false;
            }
        }
        true
    }
}

/// What an issuance writes once a number has been allocated
#[derive(Debug, Clone)]
pub struct IssuanceWrite {
    /// The issued invoice, number and snapshots filled in
    pub invoice: Invoice,
    /// Events to append; may reference other invoices of the same issuer
    pub events: Vec<InvoiceEvent>,
}

/// Builds the issued invoice from the locked draft and its allocated number
pub type FinalizeIssuance = Box<dyn FnOnce(Invoice, &AllocatedNumber) -> IssuanceWrite + Send>;

/// One atomic issuance
///
/// The store locks the invoice, checks it is still the expected draft,
/// allocates the next number for `series_key`, calls `finalize` and writes
/// the result. Either all of it commits or none of it does; in particular a
/// failed write leaves the series counter untouched.
pub struct IssuanceCommit {
    pub issuer_id: IssuerId,
    pub invoice_id: InvoiceId,
    pub expected_version: i64,
    pub series_key: SeriesKey,
    pub finalize: FinalizeIssuance,
}

impl std::fmt::Debug for IssuanceCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceCommit")
            .field("issuer_id", &self.issuer_id)
            .field("invoice_id", &self.invoice_id)
            .field("expected_version", &self.expected_version)
            .field("series_key", &self.series_key)
            .finish_non_exhaustive()
    }
}

/// Result of [`InvoiceStore::commit_issuance`]
#[derive(Debug, Clone)]
pub enum IssuanceReceipt {
    /// A number was allocated and the invoice is now issued
    Issued(Invoice),
    /// The invoice already carried a number; nothing was written
    AlreadyIssued(Invoice),
    /// The invoice is neither a draft nor issued (a canceled draft)
    NotDraft(Invoice),
}

/// Persistence for invoices and everything they own
///
/// Writes are conditional on the invoice's `version`; a stale version yields
/// `PortError::Conflict`. Successful writes store `version + 1`.
#[async_trait]
pub trait InvoiceStore: DomainPort + HealthCheckable {
    /// Persists a new draft with its events
    async fn insert(&self, invoice: &Invoice, events: Vec<InvoiceEvent>) -> Result<(), PortError>;

    /// Loads an invoice with its lines and payments
    async fn get(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Option<Invoice>, PortError>;

    /// Lists an issuer's invoices, newest issue date first
    async fn list(&self, issuer_id: IssuerId, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError>;

    /// Issued invoices across all issuers that are not yet paid or canceled
    async fn list_open(&self) -> Result<Vec<Invoice>, PortError>;

    /// Replaces the invoice (lines and payments included) and appends events
    async fn save(
        &self,
        invoice: &Invoice,
        expected_version: i64,
        events: Vec<InvoiceEvent>,
    ) -> Result<Invoice, PortError>;

    /// Hard-deletes an invoice that is still a draft; `false` if it was not
    async fn delete_draft(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<bool, PortError>;

    /// Allocates a number and issues the invoice atomically
    async fn commit_issuance(&self, commit: IssuanceCommit) -> Result<IssuanceReceipt, PortError>;

    /// Audit trail in insertion order
    async fn events(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Vec<InvoiceEvent>, PortError>;
}

/// Idempotency ledger for reminders
#[async_trait]
pub trait ReminderLog: DomainPort {
    async fn has_sent(&self, invoice_id: InvoiceId, rule_key: &str) -> Result<bool, PortError>;

    /// Writes the log row and its `REMINDER_SENT` event together
    ///
    /// Returns `false` when a row for (invoice, rule) already existed, in
    /// which case nothing is written.
    async fn record_sent(&self, entry: &ReminderLogEntry, event: InvoiceEvent) -> Result<bool, PortError>;

    async fn entries(&self, invoice_id: InvoiceId) -> Result<Vec<ReminderLogEntry>, PortError>;
}

// ============================================================================
// Collaborator ports
// ============================================================================

#[async_trait]
pub trait CounterpartyDirectory: DomainPort + HealthCheckable {
    async fn find_counterparty(
        &self,
        issuer_id: IssuerId,
        counterparty: Counterparty,
    ) -> Result<Option<CounterpartyRecord>, PortError>;
}

#[async_trait]
pub trait BrandingProvider: DomainPort {
    async fn get_branding(&self, issuer_id: IssuerId) -> Result<Option<BrandingProfile>, PortError>;
}

/// Outbound notifications; delivery is best-effort
#[async_trait]
pub trait Notifier: DomainPort {
    async fn send(&self, notification: &Notification) -> Result<(), PortError>;
}

/// Pure transformation of a document model into bytes
pub trait DocumentRenderer: DomainPort {
    fn content_type(&self) -> &'static str;

    fn render(&self, model: &DocumentModel) -> Result<Vec<u8>, PortError>;
}

/// Rendered artifacts, one per invoice
#[async_trait]
pub trait DocumentStore: DomainPort {
    /// Stores the artifact, overwriting any previous one
    async fn put(&self, document: StoredDocument) -> Result<(), PortError>;

    async fn get(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<Option<StoredDocument>, PortError>;

    /// Drops a cached artifact after the draft it was rendered from changed
    async fn invalidate(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<(), PortError>;
}
