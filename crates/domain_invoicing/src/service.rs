//! Invoice lifecycle service
//!
//! Orchestrates every mutation of an invoice: draft creation and editing,
//! issuance, payments, cancellation, views and rectifications. Each
//! operation is a single read-modify-write of one invoice, persisted through
//! a version-checked store write so a concurrent change is detected instead
//! of overwritten. Issuance additionally allocates the legal number inside
//! the same atomic store commit.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{Clock, Currency, InvoiceId, IssuerId, Timezone};

use crate::document::{DocumentModel, DocumentPipeline};
use crate::due::{compute_invoice_due_info, DueInfo, DueState};
use crate::error::InvoicingError;
use crate::events::{InvoiceEvent, InvoiceEventType};
use crate::fiscal::{missing_fiscal_fields, FiscalRequirements};
use crate::invoice::{
    recompute_status, Counterparty, Invoice, InvoiceOrigin, InvoiceStatus, InvoiceType,
    RectificationType, DRAFT_NUMBER_PLACEHOLDER,
};
use crate::payment::NewPayment;
use crate::ports::{
    BrandingProfile, BrandingProvider, CounterpartyDirectory, FinalizeIssuance, InvoiceQuery,
    InvoiceStore, IssuanceCommit, IssuanceReceipt, IssuanceWrite, StoredDocument,
};
use crate::receivables::{summarize_receivables, ReceivablesSummary};
use crate::rectification::{
    check_rectifiable, rectification_issued_metadata, rectification_lines, rectification_link,
    rectifies_metadata,
};
use crate::reminders::{reminders_for_date, ReminderCandidate, ReminderRules};
use crate::sequence::{default_series, AllocatedNumber, SeriesKey};
use crate::snapshot::{CompanySnapshot, CounterpartySnapshot, TotalsSnapshot};
use crate::totals::{compute_invoice, CalculationOptions, LineSpec, PricingMode};

/// Engine-wide settings
#[derive(Debug, Clone, Default)]
pub struct InvoicingSettings {
    /// Calendar used to turn "now" into today's date
    pub timezone: Timezone,
    pub fiscal: FiscalRequirements,
    pub reminder_rules: ReminderRules,
}

/// Full content of a draft, used for both create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSpec {
    pub invoice_type: InvoiceType,
    pub counterparty: Option<Counterparty>,
    #[serde(default)]
    pub origin: InvoiceOrigin,
    /// Defaults by invoice type
    pub series: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub currency: Currency,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    pub lines: Vec<LineSpec>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
}

impl DraftSpec {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match (self.invoice_type, self.counterparty) {
            (InvoiceType::Customer, Some(Counterparty::Client(_))) => {}
            (InvoiceType::Customer, _) => errors.push("A customer invoice requires a client".to_string()),
            (InvoiceType::Vendor, Some(Counterparty::Client(_))) => {
                errors.push("A vendor invoice must reference a provider".to_string())
            }
            (InvoiceType::Vendor, _) => {}
        }
        if self.due_date < self.issue_date {
            errors.push("Due date cannot be before the issue date".to_string());
        }
        if self.lines.is_empty() {
            errors.push("An invoice needs at least one line".to_string());
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                errors.push(format!("Line {}: description is required", i + 1));
            }
        }
        if self.series.as_deref().is_some_and(|s| s.trim().is_empty()) {
            errors.push("Series cannot be blank".to_string());
        }
        errors
    }
}

/// Pre-flight result of issuance checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEligibility {
    pub eligible: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum IssueOutcome {
    Issued(Invoice),
    /// The invoice already had a number; nothing changed
    AlreadyIssued(Invoice),
}

impl IssueOutcome {
    pub fn invoice(&self) -> &Invoice {
        match self {
            IssueOutcome::Issued(i) | IssueOutcome::AlreadyIssued(i) => i,
        }
    }

    pub fn into_invoice(self) -> Invoice {
        match self {
            IssueOutcome::Issued(i) | IssueOutcome::AlreadyIssued(i) => i,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Canceled(Invoice),
    AlreadyCancelled(Invoice),
}

impl CancelOutcome {
    pub fn invoice(&self) -> &Invoice {
        match self {
            CancelOutcome::Canceled(i) | CancelOutcome::AlreadyCancelled(i) => i,
        }
    }
}

/// An invoice as read by callers, with its time-derived facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub due: DueInfo,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
}

/// List filters, including the derived due state
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub query: InvoiceQuery,
    pub due_state: Option<DueState>,
}

/// What issuance will snapshot, gathered before the atomic commit
struct IssuanceSources {
    branding: BrandingProfile,
    counterparty: Option<CounterpartySnapshot>,
}

/// The invoice lifecycle service
pub struct InvoiceService {
    store: Arc<dyn InvoiceStore>,
    directory: Arc<dyn CounterpartyDirectory>,
    branding: Arc<dyn BrandingProvider>,
    documents: DocumentPipeline,
    clock: Arc<dyn Clock>,
    settings: InvoicingSettings,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        directory: Arc<dyn CounterpartyDirectory>,
        branding: Arc<dyn BrandingProvider>,
        documents: DocumentPipeline,
        clock: Arc<dyn Clock>,
        settings: InvoicingSettings,
    ) -> Self {
        Self {
            store,
            directory,
            branding,
            documents,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &InvoicingSettings {
        &self.settings
    }

    /// Today in the configured timezone
    pub fn today(&self) -> NaiveDate {
        self.settings.timezone.today(self.clock.as_ref())
    }

    async fn load(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Invoice, InvoicingError> {
        self.store
            .get(issuer_id, id)
            .await?
            .ok_or(InvoicingError::NotFound(id))
    }

    async fn persist(
        &self,
        invoice: &Invoice,
        expected_version: i64,
        events: Vec<InvoiceEvent>,
    ) -> Result<Invoice, InvoicingError> {
        self.store
            .save(invoice, expected_version, events)
            .await
            .map_err(InvoicingError::from_write)
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    /// Creates a `DRAFT` with a placeholder number
    #[instrument(skip(self, spec), fields(issuer_id = %issuer_id))]
    pub async fn create_invoice(&self, issuer_id: IssuerId, spec: DraftSpec) -> Result<Invoice, InvoicingError> {
        let mut errors = spec.validate();
        let computed = compute_invoice(
            &spec.lines,
            CalculationOptions {
                default_mode: spec.pricing_mode,
                allow_negative_amounts: false,
            },
        );
        let computed = match computed {
            Ok(c) if errors.is_empty() => c,
            Ok(_) => return Err(InvoicingError::Validation(errors)),
            Err(line_errors) => {
                errors.extend(line_errors);
                return Err(InvoicingError::Validation(errors));
            }
        };

        let branding = self.branding.get_branding(issuer_id).await?;
        let now = self.clock.now();
        let series = spec
            .series
            .clone()
            .unwrap_or_else(|| default_series(spec.invoice_type, false).to_string());

        let mut invoice = blank_draft(issuer_id, &spec, series, now);
        if let Some(branding) = branding {
            apply_branding_defaults(&mut invoice, &branding);
        }
        invoice.replace_lines(computed.lines, computed.totals);

        let event = InvoiceEvent::new(
            issuer_id,
            invoice.id,
            InvoiceEventType::Created,
            json!({ "total": invoice.total, "currency": invoice.currency, "origin": invoice.origin }),
            now,
        );
        self.store.insert(&invoice, vec![event]).await?;

        info!(invoice_id = %invoice.id, total = %invoice.total, "Draft invoice created");
        Ok(invoice)
    }

    /// Replaces the content of a draft, lines included
    #[instrument(skip(self, spec), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn update_draft_invoice(
        &self,
        issuer_id: IssuerId,
        id: InvoiceId,
        spec: DraftSpec,
    ) -> Result<Invoice, InvoicingError> {
        let current = self.load(issuer_id, id).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(InvoicingError::invalid_state(id, current.status, "edit"));
        }

        let mut errors = spec.validate();
        if current.is_rectification() && spec.counterparty != current.counterparty {
            errors.push("The counterparty of a rectification cannot change".to_string());
        }
        let options = CalculationOptions {
            default_mode: spec.pricing_mode,
            allow_negative_amounts: current.is_rectification(),
        };
        match compute_invoice(&spec.lines, options) {
            Ok(computed) if errors.is_empty() => {
                let now = self.clock.now();
                let mut invoice = current.clone();
                invoice.invoice_type = spec.invoice_type;
                invoice.counterparty = spec.counterparty;
                invoice.origin = spec.origin;
                if let Some(series) = spec.series {
                    invoice.series = series;
                }
                invoice.issue_date = spec.issue_date;
                invoice.due_date = spec.due_date;
                invoice.service_date = spec.service_date;
                invoice.currency = spec.currency;
                invoice.pricing_mode = spec.pricing_mode;
                invoice.notes = spec.notes;
                invoice.terms = spec.terms;
                invoice.payment_method = spec.payment_method;
                invoice.payment_details = spec.payment_details;
                invoice.replace_lines(computed.lines, computed.totals);
                invoice.updated_at = now;

                let event = InvoiceEvent::new(
                    issuer_id,
                    id,
                    InvoiceEventType::Edited,
                    json!({ "total": invoice.total, "line_count": invoice.lines.len() }),
                    now,
                );
                let saved = self.persist(&invoice, current.version, vec![event]).await?;
                self.documents.invalidate(issuer_id, id).await;

                info!(total = %saved.total, "Draft invoice updated");
                Ok(saved)
            }
            Ok(_) => Err(InvoicingError::Validation(errors)),
            Err(line_errors) => {
                errors.extend(line_errors);
                Err(InvoicingError::Validation(errors))
            }
        }
    }

    /// Hard-deletes a draft
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn delete_draft_invoice(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<(), InvoicingError> {
        let current = self.load(issuer_id, id).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(InvoicingError::invalid_state(id, current.status, "delete"));
        }
        if !self.store.delete_draft(issuer_id, id).await? {
            // Issued or canceled between the read and the delete
            let status = self
                .store
                .get(issuer_id, id)
                .await?
                .map(|i| i.status)
                .unwrap_or(current.status);
            return Err(InvoicingError::invalid_state(id, status, "delete"));
        }
        self.documents.invalidate(issuer_id, id).await;
        info!("Draft invoice deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Issuance
    // ------------------------------------------------------------------

    /// Lists everything that would block issuance, without side effects
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn get_issue_eligibility(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<IssueEligibility, InvoicingError> {
        let invoice = self.load(issuer_id, id).await?;
        let mut missing = Vec::new();
        match invoice.status {
            InvoiceStatus::Draft => {}
            InvoiceStatus::Canceled => missing.push("Invoice is canceled".to_string()),
            _ => missing.push("Invoice is already issued".to_string()),
        }
        let (problems, _) = self.gather_issuance_sources(&invoice).await?;
        missing.extend(problems);

        Ok(IssueEligibility {
            eligible: missing.is_empty(),
            missing,
        })
    }

    /// Fiscal checks plus the live data issuance will freeze
    async fn gather_issuance_sources(
        &self,
        invoice: &Invoice,
    ) -> Result<(Vec<String>, Option<IssuanceSources>), InvoicingError> {
        let requirements = &self.settings.fiscal;
        let mut missing = Vec::new();
        if invoice.lines.is_empty() {
            missing.push("Invoice has no lines".to_string());
        }

        let branding = self.branding.get_branding(invoice.issuer_id).await?;
        match &branding {
            Some(profile) => missing.extend(missing_fiscal_fields(profile, requirements)),
            None => missing.push("Issuer profile is missing".to_string()),
        }

        let now = self.clock.now();
        let counterparty = match (&invoice.counterparty_snapshot, invoice.counterparty) {
            (Some(frozen), _) => {
                missing.extend(missing_fiscal_fields(frozen, requirements));
                Some(frozen.clone())
            }
            (None, Some(reference)) => match self.directory.find_counterparty(invoice.issuer_id, reference).await? {
                Some(record) => {
                    missing.extend(missing_fiscal_fields(&record, requirements));
                    Some(CounterpartySnapshot::capture(reference, &record, now))
                }
                None => {
                    missing.push("Counterparty not found".to_string());
                    None
                }
            },
            (None, None) => {
                if invoice.invoice_type == InvoiceType::Customer {
                    missing.push("A customer invoice requires a client".to_string());
                }
                None
            }
        };

        let sources = branding.map(|branding| IssuanceSources { branding, counterparty });
        Ok((missing, sources))
    }

    /// Assigns the legal number and freezes the snapshots
    ///
    /// Calling this on an invoice that already has a number is a no-op that
    /// returns [`IssueOutcome::AlreadyIssued`].
    ///
    /// The series counter is keyed by the year of the invoice's `issue_date`,
    /// not the clock: a draft dated 2025-12-30 draws from the 2025 counter
    /// even when issued in 2026, so the number and the printed date agree.
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn issue_invoice(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<IssueOutcome, InvoicingError> {
        let invoice = self.load(issuer_id, id).await?;
        if invoice.is_issued() {
            return Ok(IssueOutcome::AlreadyIssued(invoice));
        }
        if invoice.status != InvoiceStatus::Draft {
            return Err(InvoicingError::invalid_state(id, invoice.status, "issue"));
        }

        let (missing, sources) = self.gather_issuance_sources(&invoice).await?;
        let sources = match sources {
            Some(s) if missing.is_empty() => s,
            _ => return Err(InvoicingError::Validation(missing)),
        };

        let now = self.clock.now();
        let company = CompanySnapshot::capture(&sources.branding, now);
        let counterparty = sources.counterparty;
        let series_key = SeriesKey::new(invoice.series.clone(), invoice.issue_date.year());

        let finalize: FinalizeIssuance = Box::new(move |mut draft: Invoice, number: &AllocatedNumber| {
            draft.number = number.formatted.clone();
            draft.sequence = Some(number.sequence);
            draft.status = InvoiceStatus::Sent;
            draft.issued_at = Some(now);
            draft.updated_at = now;
            draft.company_snapshot = Some(company);
            draft.counterparty_snapshot = counterparty;
            draft.items_snapshot = Some(draft.lines.iter().map(|l| l.to_snapshot()).collect());
            draft.totals_snapshot = Some(TotalsSnapshot::capture(draft.currency, draft.totals()));

            let mut events = vec![InvoiceEvent::new(
                draft.issuer_id,
                draft.id,
                InvoiceEventType::Sent,
                json!({
                    "number": draft.number,
                    "series": number.key.to_string(),
                    "sequence": number.sequence,
                    "total": draft.total,
                }),
                now,
            )];
            if let Some(link) = &draft.rectification {
                events.push(InvoiceEvent::new(
                    draft.issuer_id,
                    link.rectifies_invoice_id,
                    InvoiceEventType::RectificationIssued,
                    rectification_issued_metadata(&draft, link),
                    now,
                ));
            }
            IssuanceWrite { invoice: draft, events }
        });

        let receipt = self
            .store
            .commit_issuance(IssuanceCommit {
                issuer_id,
                invoice_id: id,
                expected_version: invoice.version,
                series_key,
                finalize,
            })
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    InvoicingError::Conflict(e.to_string())
                } else {
                    warn!(error = %e, "Number allocation failed");
                    InvoicingError::Allocation(e.to_string())
                }
            })?;

        match receipt {
            IssuanceReceipt::Issued(issued) => {
                info!(number = %issued.number, "Invoice issued");
                match DocumentModel::from_issued(&issued) {
                    Ok(model) => {
                        self.documents.spawn_generate(model);
                    }
                    Err(e) => warn!(error = %e, "Issued invoice has no document model"),
                }
                Ok(IssueOutcome::Issued(issued))
            }
            IssuanceReceipt::AlreadyIssued(existing) => Ok(IssueOutcome::AlreadyIssued(existing)),
            IssuanceReceipt::NotDraft(existing) => {
                Err(InvoicingError::invalid_state(id, existing.status, "issue"))
            }
        }
    }

    // ------------------------------------------------------------------
    // Post-issuance transitions
    // ------------------------------------------------------------------

    /// Cancels a `DRAFT` or `SENT` invoice; a second cancel is a no-op
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn cancel_invoice(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<CancelOutcome, InvoicingError> {
        let current = self.load(issuer_id, id).await?;
        match current.status {
            InvoiceStatus::Canceled => return Ok(CancelOutcome::AlreadyCancelled(current)),
            InvoiceStatus::Draft | InvoiceStatus::Sent => {}
            other => return Err(InvoicingError::invalid_state(id, other, "cancel")),
        }

        let now = self.clock.now();
        let mut invoice = current.clone();
        invoice.status = InvoiceStatus::Canceled;
        invoice.canceled_at = Some(now);
        invoice.updated_at = now;
        let event = InvoiceEvent::new(
            issuer_id,
            id,
            InvoiceEventType::Canceled,
            json!({ "previous_status": current.status, "number": current.number }),
            now,
        );
        let saved = self.persist(&invoice, current.version, vec![event]).await?;

        info!(previous_status = %current.status, "Invoice canceled");
        Ok(CancelOutcome::Canceled(saved))
    }

    /// Appends a payment and re-derives the status
    #[instrument(skip(self, payment), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn register_payment(
        &self,
        issuer_id: IssuerId,
        id: InvoiceId,
        payment: NewPayment,
    ) -> Result<Invoice, InvoicingError> {
        let current = self.load(issuer_id, id).await?;
        if matches!(current.status, InvoiceStatus::Draft | InvoiceStatus::Canceled) {
            return Err(InvoicingError::invalid_state(id, current.status, "register a payment on"));
        }
        let errors = payment.validate(current.currency);
        if !errors.is_empty() {
            return Err(InvoicingError::Validation(errors));
        }

        let now = self.clock.now();
        let payment = payment.into_payment(id, now);
        let mut invoice = current.clone();
        invoice.payments.push(payment.clone());

        let derived = recompute_status(&invoice, self.today())?;
        invoice.status = derived.status;
        invoice.paid_at = derived.paid_at;
        invoice.updated_at = now;

        let mut events = vec![InvoiceEvent::new(
            issuer_id,
            id,
            InvoiceEventType::Payment,
            json!({
                "payment_id": payment.id,
                "amount": payment.amount.amount(),
                "method": payment.method.as_str(),
                "reference": payment.reference,
            }),
            now,
        )];
        if invoice.status == InvoiceStatus::Paid && current.status != InvoiceStatus::Paid {
            events.push(InvoiceEvent::new(
                issuer_id,
                id,
                InvoiceEventType::Paid,
                json!({ "paid_at": invoice.paid_at }),
                now,
            ));
        }

        let saved = self.persist(&invoice, current.version, events).await?;
        info!(amount = %payment.amount, status = %saved.status, "Payment registered");
        Ok(saved)
    }

    /// Marks a sent invoice as viewed by its recipient
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn record_view(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Invoice, InvoicingError> {
        let current = self.load(issuer_id, id).await?;
        if current.status == InvoiceStatus::Draft {
            return Err(InvoicingError::invalid_state(id, current.status, "view"));
        }
        if current.viewed_at.is_some() || current.status == InvoiceStatus::Canceled {
            return Ok(current);
        }

        let now = self.clock.now();
        let mut invoice = current.clone();
        invoice.viewed_at = Some(now);
        invoice.updated_at = now;
        if invoice.status == InvoiceStatus::Sent {
            invoice.status = InvoiceStatus::Viewed;
        }
        let event = InvoiceEvent::bare(issuer_id, id, InvoiceEventType::Viewed, now);
        Ok(self.persist(&invoice, current.version, vec![event]).await?)
    }

    // ------------------------------------------------------------------
    // Rectification
    // ------------------------------------------------------------------

    /// Creates a corrective draft linked to an issued invoice
    #[instrument(skip(self, reason), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn create_rectification(
        &self,
        issuer_id: IssuerId,
        id: InvoiceId,
        reason: &str,
        kind: RectificationType,
    ) -> Result<Invoice, InvoicingError> {
        let original = self.load(issuer_id, id).await?;
        check_rectifiable(&original, reason)?;

        let specs = rectification_lines(&original, kind);
        let computed = compute_invoice(
            &specs,
            CalculationOptions {
                default_mode: original.pricing_mode,
                allow_negative_amounts: true,
            },
        )
        .map_err(InvoicingError::Validation)?;

        let now = self.clock.now();
        let today = self.today();
        let payment_window = original.due_date - original.issue_date;
        let link = rectification_link(&original, reason, kind);

        let spec = DraftSpec {
            invoice_type: original.invoice_type,
            counterparty: original.counterparty,
            origin: InvoiceOrigin::None,
            series: None,
            issue_date: today,
            due_date: today + payment_window,
            service_date: original.service_date,
            currency: original.currency,
            pricing_mode: original.pricing_mode,
            lines: specs,
            notes: Some(format!("Rectifies invoice {}: {}", original.number, link.reason)),
            terms: original.terms.clone(),
            payment_method: original.payment_method.clone(),
            payment_details: original.payment_details.clone(),
        };
        let series = default_series(original.invoice_type, true).to_string();
        let mut draft = blank_draft(issuer_id, &spec, series, now);
        draft.replace_lines(computed.lines, computed.totals);
        draft.counterparty_snapshot = original.counterparty_snapshot.clone();
        draft.rectification = Some(link.clone());

        let events = vec![
            InvoiceEvent::new(
                issuer_id,
                draft.id,
                InvoiceEventType::Created,
                json!({ "total": draft.total, "currency": draft.currency, "rectification": true }),
                now,
            ),
            InvoiceEvent::new(issuer_id, draft.id, InvoiceEventType::Rectifies, rectifies_metadata(&link), now),
        ];
        self.store.insert(&draft, events).await?;

        info!(
            rectification_id = %draft.id,
            rectifies = %original.number,
            kind = kind.as_str(),
            total = %draft.total,
            "Rectification draft created"
        );
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    fn view(&self, invoice: Invoice, today: NaiveDate) -> Result<InvoiceView, InvoicingError> {
        let due = compute_invoice_due_info(&invoice, today);
        let amount_paid = invoice.amount_paid()?.amount();
        let balance_due = invoice.balance_due()?.amount();
        Ok(InvoiceView {
            invoice,
            due,
            amount_paid,
            balance_due,
        })
    }

    /// Wraps an invoice just returned by a mutation with today's due facts
    pub fn view_of(&self, invoice: Invoice) -> Result<InvoiceView, InvoicingError> {
        self.view(invoice, self.today())
    }

    pub async fn get_invoice(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<InvoiceView, InvoicingError> {
        let invoice = self.load(issuer_id, id).await?;
        self.view(invoice, self.today())
    }

    #[instrument(skip(self, filter), fields(issuer_id = %issuer_id))]
    pub async fn list_invoices(&self, issuer_id: IssuerId, filter: InvoiceFilter) -> Result<Vec<InvoiceView>, InvoicingError> {
        let today = self.today();
        let Some(due_state) = filter.due_state else {
            let invoices = self.store.list(issuer_id, &filter.query).await?;
            return invoices.into_iter().map(|i| self.view(i, today)).collect();
        };

        // Due state is derived, so pagination has to happen after filtering
        let mut query = filter.query.clone();
        query.limit = None;
        query.offset = None;
        let invoices = self.store.list(issuer_id, &query).await?;
        let offset = filter.query.offset.unwrap_or(0) as usize;
        let limit = filter.query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        invoices
            .into_iter()
            .map(|i| self.view(i, today))
            .filter(|v| v.as_ref().map(|v| v.due.state == due_state).unwrap_or(true))
            .skip(offset)
            .take(limit)
            .collect()
    }

    pub async fn list_invoice_events(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Vec<InvoiceEvent>, InvoicingError> {
        self.load(issuer_id, id).await?;
        Ok(self.store.events(issuer_id, id).await?)
    }

    /// Reminders that fire on `date` (today when omitted); nothing is sent
    pub async fn get_invoice_reminders_for_date(
        &self,
        issuer_id: IssuerId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ReminderCandidate>, InvoicingError> {
        let date = date.unwrap_or_else(|| self.today());
        let invoices = self.store.list(issuer_id, &InvoiceQuery::default()).await?;
        Ok(reminders_for_date(&invoices, date, &self.settings.reminder_rules))
    }

    pub async fn summarize_receivables(&self, issuer_id: IssuerId) -> Result<Vec<ReceivablesSummary>, InvoicingError> {
        let invoices = self.store.list(issuer_id, &InvoiceQuery::default()).await?;
        Ok(summarize_receivables(&invoices, self.today())?)
    }

    /// Renders and stores the document now, overwriting any previous one
    ///
    /// Issued invoices render from their snapshots; drafts render a preview
    /// from live branding and counterparty data.
    #[instrument(skip(self), fields(issuer_id = %issuer_id, invoice_id = %id))]
    pub async fn regenerate_document(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<StoredDocument, InvoicingError> {
        let invoice = self.load(issuer_id, id).await?;
        let model = if invoice.is_issued() {
            DocumentModel::from_issued(&invoice)?
        } else {
            let branding = self
                .branding
                .get_branding(issuer_id)
                .await?
                .ok_or_else(|| InvoicingError::validation("Issuer profile is missing"))?;
            let record = match invoice.counterparty {
                Some(reference) => self.directory.find_counterparty(issuer_id, reference).await?,
                None => None,
            };
            DocumentModel::preview(&invoice, &branding, record.as_ref(), self.clock.now())
        };
        Ok(self.documents.generate(&model).await?)
    }
}

fn blank_draft(issuer_id: IssuerId, spec: &DraftSpec, series: String, now: DateTime<Utc>) -> Invoice {
    Invoice {
        id: InvoiceId::new_v7(),
        issuer_id,
        invoice_type: spec.invoice_type,
        number: DRAFT_NUMBER_PLACEHOLDER.to_string(),
        series,
        sequence: None,
        counterparty: spec.counterparty,
        origin: spec.origin,
        issue_date: spec.issue_date,
        due_date: spec.due_date,
        service_date: spec.service_date,
        currency: spec.currency,
        pricing_mode: spec.pricing_mode,
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total: Decimal::ZERO,
        status: InvoiceStatus::Draft,
        notes: spec.notes.clone(),
        terms: spec.terms.clone(),
        payment_method: spec.payment_method.clone(),
        payment_details: spec.payment_details.clone(),
        issued_at: None,
        viewed_at: None,
        paid_at: None,
        canceled_at: None,
        rectification: None,
        company_snapshot: None,
        counterparty_snapshot: None,
        items_snapshot: None,
        totals_snapshot: None,
        lines: Vec::new(),
        payments: Vec::new(),
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

fn apply_branding_defaults(invoice: &mut Invoice, branding: &BrandingProfile) {
    if invoice.notes.as_deref().map_or(true, |n| n.trim().is_empty()) {
        invoice.notes = branding.default_notes_template.clone();
    }
    if invoice.terms.as_deref().map_or(true, |t| t.trim().is_empty()) {
        invoice.terms = branding.default_terms_template.clone();
    }
    if invoice.payment_details.is_none() {
        invoice.payment_details = branding.payment_conditions.clone();
    }
}
