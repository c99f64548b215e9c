//! PostgreSQL invoice store
//!
//! Implements both [`InvoiceStore`] and [`ReminderLog`] over one pool, so the
//! reminder log rows and their `REMINDER_SENT` events share the invoice
//! tables' transactions.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, IssuerId, PortError};
use domain_invoicing::{
    Invoice, InvoiceEvent, InvoiceQuery, InvoiceStore, IssuanceCommit, IssuanceReceipt, ReminderLog,
    ReminderLogEntry,
};

use crate::error::DatabaseError;
use crate::repositories::{InvoiceRepository, ReminderLogRepository};

/// PostgreSQL-backed invoice persistence
///
/// Stale versions surface as `PortError::Conflict`; a lost issuance race is
/// reported through the receipt rather than as an error.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    invoices: InvoiceRepository,
    reminders: ReminderLogRepository,
    pool: PgPool,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            invoices: InvoiceRepository::new(pool.clone()),
            reminders: ReminderLogRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &InvoiceRepository {
        &self.invoices
    }
}

fn invoice_error(error: DatabaseError) -> PortError {
    match error {
        DatabaseError::NotFound(message) => PortError::not_found("Invoice", message),
        other => other.into(),
    }
}

impl DomainPort for PostgresInvoiceStore {}

#[async_trait]
impl HealthCheckable for PostgresInvoiceStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-invoice-store").await
    }
}

#[async_trait]
impl InvoiceStore for PostgresInvoiceStore {
    #[instrument(skip(self, invoice, events), fields(invoice_id = %invoice.id))]
    async fn insert(&self, invoice: &Invoice, events: Vec<InvoiceEvent>) -> Result<(), PortError> {
        self.invoices.insert(invoice, &events).await.map_err(invoice_error)
    }

    async fn get(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        self.invoices.get(issuer_id, id).await.map_err(invoice_error)
    }

    #[instrument(skip(self, query))]
    async fn list(&self, issuer_id: IssuerId, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let invoices = self.invoices.list(issuer_id, query).await.map_err(invoice_error)?;
        debug!(count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    async fn list_open(&self) -> Result<Vec<Invoice>, PortError> {
        self.invoices.list_open().await.map_err(invoice_error)
    }

    #[instrument(skip(self, invoice, events), fields(invoice_id = %invoice.id))]
    async fn save(
        &self,
        invoice: &Invoice,
        expected_version: i64,
        events: Vec<InvoiceEvent>,
    ) -> Result<Invoice, PortError> {
        self.invoices
            .save(invoice, expected_version, &events)
            .await
            .map_err(invoice_error)
    }

    async fn delete_draft(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<bool, PortError> {
        self.invoices.delete_draft(issuer_id, id).await.map_err(invoice_error)
    }

    #[instrument(skip(self, commit), fields(invoice_id = %commit.invoice_id, series = %commit.series_key))]
    async fn commit_issuance(&self, commit: IssuanceCommit) -> Result<IssuanceReceipt, PortError> {
        self.invoices.issue(commit).await.map_err(invoice_error)
    }

    async fn events(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Vec<InvoiceEvent>, PortError> {
        self.invoices.events(issuer_id, id).await.map_err(invoice_error)
    }
}

#[async_trait]
impl ReminderLog for PostgresInvoiceStore {
    async fn has_sent(&self, invoice_id: InvoiceId, rule_key: &str) -> Result<bool, PortError> {
        Ok(self.reminders.has_sent(invoice_id, rule_key).await?)
    }

    #[instrument(skip(self, entry, event), fields(invoice_id = %entry.invoice_id, rule = %entry.rule_key))]
    async fn record_sent(&self, entry: &ReminderLogEntry, event: InvoiceEvent) -> Result<bool, PortError> {
        Ok(self.reminders.record_sent(entry, &event).await?)
    }

    async fn entries(&self, invoice_id: InvoiceId) -> Result<Vec<ReminderLogEntry>, PortError> {
        Ok(self.reminders.entries(invoice_id).await?)
    }
}
