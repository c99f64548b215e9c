//! Document generation
//!
//! A [`DocumentModel`] is everything a renderer may print. For an issued
//! invoice it is assembled from the issuance snapshots only; live branding and
//! counterparty data are used solely for draft previews.
//!
//! Generation runs after issuance without blocking it, and may be re-run at
//! any time: the stored artifact is overwritten and the number is read from
//! the invoice, never re-derived.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use core_kernel::{Clock, Currency, DomainPort, InvoiceId, IssuerId, PortError};

use crate::error::InvoicingError;
use crate::invoice::{Invoice, InvoiceStatus, InvoiceType, RectificationLink};
use crate::ports::{BrandingProfile, CounterpartyRecord, DocumentRenderer, DocumentStore, StoredDocument};
use crate::snapshot::{CompanySnapshot, CounterpartySnapshot, LineSnapshot, TotalsSnapshot};
use crate::totals::InvoiceTotals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub invoice_id: InvoiceId,
    pub issuer_id: IssuerId,
    pub number: String,
    pub invoice_type: InvoiceType,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub company: CompanySnapshot,
    pub counterparty: Option<CounterpartySnapshot>,
    pub lines: Vec<LineSnapshot>,
    pub totals: TotalsSnapshot,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
    pub rectification: Option<RectificationLink>,
    /// True when built from live data for an unissued draft
    pub is_preview: bool,
}

impl DocumentModel {
    /// Model of an issued invoice, from its frozen snapshots
    pub fn from_issued(invoice: &Invoice) -> Result<Self, InvoicingError> {
        let (Some(company), Some(lines), Some(totals)) = (
            invoice.company_snapshot.clone(),
            invoice.items_snapshot.clone(),
            invoice.totals_snapshot,
        ) else {
            return Err(InvoicingError::invalid_state(invoice.id, invoice.status, "render from snapshots"));
        };

        Ok(Self {
            invoice_id: invoice.id,
            issuer_id: invoice.issuer_id,
            number: invoice.number.clone(),
            invoice_type: invoice.invoice_type,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            service_date: invoice.service_date,
            company,
            counterparty: invoice.counterparty_snapshot.clone(),
            lines,
            totals,
            notes: invoice.notes.clone(),
            terms: invoice.terms.clone(),
            payment_method: invoice.payment_method.clone(),
            payment_details: invoice.payment_details.clone(),
            rectification: invoice.rectification.clone(),
            is_preview: false,
        })
    }

    /// Preview of a draft from live collaborator data
    pub fn preview(
        invoice: &Invoice,
        branding: &BrandingProfile,
        counterparty: Option<&CounterpartyRecord>,
        at: DateTime<Utc>,
    ) -> Self {
        let counterparty = match (invoice.counterparty_snapshot.clone(), invoice.counterparty, counterparty) {
            (Some(frozen), _, _) => Some(frozen),
            (None, Some(reference), Some(record)) => Some(CounterpartySnapshot::capture(reference, record, at)),
            _ => None,
        };

        Self {
            invoice_id: invoice.id,
            issuer_id: invoice.issuer_id,
            number: invoice.number.clone(),
            invoice_type: invoice.invoice_type,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            service_date: invoice.service_date,
            company: CompanySnapshot::capture(branding, at),
            counterparty,
            lines: invoice.lines.iter().map(|l| l.to_snapshot()).collect(),
            totals: TotalsSnapshot::capture(
                invoice.currency,
                InvoiceTotals {
                    subtotal: invoice.subtotal,
                    tax_amount: invoice.tax_amount,
                    total: invoice.total,
                },
            ),
            notes: invoice.notes.clone(),
            terms: invoice.terms.clone(),
            payment_method: invoice.payment_method.clone(),
            payment_details: invoice.payment_details.clone(),
            rectification: invoice.rectification.clone(),
            is_preview: true,
        }
    }

    pub fn currency(&self) -> Currency {
        self.totals.currency
    }
}

/// Renders the model as pretty-printed JSON
///
/// Stands in wherever no layout engine is wired; output is deterministic for
/// a given model.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentRenderer;

impl DomainPort for JsonDocumentRenderer {}

impl DocumentRenderer for JsonDocumentRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, model: &DocumentModel) -> Result<Vec<u8>, PortError> {
        serde_json::to_vec_pretty(model).map_err(|e| PortError::internal(format!("Failed to render document: {}", e)))
    }
}

/// Renders models and stores the artifacts
#[derive(Clone)]
pub struct DocumentPipeline {
    renderer: Arc<dyn DocumentRenderer>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl DocumentPipeline {
    pub fn new(renderer: Arc<dyn DocumentRenderer>, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { renderer, store, clock }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Renders and overwrites the stored artifact
    pub async fn generate(&self, model: &DocumentModel) -> Result<StoredDocument, PortError> {
        let content = self.renderer.render(model)?;
        let document = StoredDocument {
            invoice_id: model.invoice_id,
            issuer_id: model.issuer_id,
            number: model.number.clone(),
            content_type: self.renderer.content_type().to_string(),
            content,
            generated_at: self.clock.now(),
        };
        self.store.put(document.clone()).await?;
        debug!(invoice_id = %model.invoice_id, bytes = document.content.len(), "Document stored");
        Ok(document)
    }

    /// Fire-and-forget generation; failures are logged, never returned
    pub fn spawn_generate(&self, model: DocumentModel) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.generate(&model).await {
                warn!(invoice_id = %model.invoice_id, error = %e, "Document generation failed");
            }
        })
    }

    /// Drops the cached artifact; failures are logged
    pub async fn invalidate(&self, issuer_id: IssuerId, invoice_id: InvoiceId) {
        if let Err(e) = self.store.invalidate(issuer_id, invoice_id).await {
            warn!(%invoice_id, error = %e, "Document invalidation failed");
        }
    }
}
