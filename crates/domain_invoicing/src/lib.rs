//! Invoicing Domain - Invoice Lifecycle & Ledger Engine
//!
//! This crate computes invoice totals, assigns legal sequential numbers,
//! derives invoice status from payments and due dates, freezes audit
//! snapshots at issuance and schedules idempotent payment reminders.
//!
//! # Components
//!
//! - **Totals** ([`totals`]): pure line and aggregate calculation, the only
//!   source of monetary values
//! - **Due state** ([`due`]): temporal classification, recomputed on read
//! - **Reminders** ([`reminders`]): rule matching plus the daily sweep
//! - **Numbering** ([`sequence`]): series keys and `YYYY-XXXX` formatting;
//!   allocation itself is atomic with issuance inside the [`InvoiceStore`]
//! - **Lifecycle** ([`service`]): create, edit, issue, pay, cancel, rectify
//!
//! # Lifecycle
//!
//! ```text
//! create ──▶ DRAFT ──issue──▶ SENT ──payments/time──▶ PARTIAL | PAID | OVERDUE
//!              │                │
//!              └──cancel────────┴──▶ CANCELED
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_invoicing::{InvoiceService, NewPayment, PaymentMethod};
//!
//! let draft = service.create_invoice(issuer_id, spec).await?;
//! let issued = service.issue_invoice(issuer_id, draft.id).await?.into_invoice();
//! assert_eq!(issued.number, "2026-0001");
//!
//! service
//!     .register_payment(issuer_id, issued.id, NewPayment::new(amount, PaymentMethod::BankTransfer))
//!     .await?;
//! ```

pub mod totals;
pub mod invoice;
pub mod payment;
pub mod snapshot;
pub mod events;
pub mod sequence;
pub mod fiscal;
pub mod due;
pub mod reminders;
pub mod rectification;
pub mod receivables;
pub mod document;
pub mod ports;
pub mod service;
pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use totals::{
    compute_invoice, compute_line, validate_lines, CalculationOptions, ComputedInvoice,
    ComputedLine, InvoiceTotals, LineSpec, PricingMode, MAX_AMOUNT,
};
pub use invoice::{
    derive_status, recompute_status, Counterparty, Invoice, InvoiceLine, InvoiceOrigin,
    InvoiceStatus, InvoiceType, RectificationLink, RectificationType, StatusDerivation,
    DRAFT_NUMBER_PLACEHOLDER,
};
pub use payment::{InvoicePayment, NewPayment, PaymentMethod};
pub use snapshot::{CompanySnapshot, CounterpartySnapshot, LineSnapshot, TotalsSnapshot};
pub use events::{InvoiceEvent, InvoiceEventType};
pub use sequence::{format_invoice_number, AllocatedNumber, SeriesCounters, SeriesKey};
pub use fiscal::{is_fiscally_complete, missing_fiscal_fields, FiscalEntity, FiscalRequirements};
pub use due::{compute_due_info, compute_invoice_due_info, DueInfo, DueState};
pub use reminders::{
    reminders_for_date, ReminderCandidate, ReminderLogEntry, ReminderRule, ReminderRules,
    ReminderService, SweepReport,
};
pub use receivables::{summarize_receivables, ReceivablesSummary};
pub use document::{DocumentModel, DocumentPipeline, JsonDocumentRenderer};
pub use ports::{
    BrandingProfile, BrandingProvider, CounterpartyDirectory, CounterpartyRecord, DocumentRenderer,
    DocumentStore, InvoiceQuery, InvoiceStore, IssuanceCommit, IssuanceReceipt, IssuanceWrite,
    Notification, NotificationChannel, Notifier, ReminderLog, StoredDocument,
};
pub use service::{
    CancelOutcome, DraftSpec, InvoiceFilter, InvoiceService, InvoiceView, InvoicingSettings,
    IssueEligibility, IssueOutcome,
};
pub use error::InvoicingError;
