//! In-memory adapters for every invoicing port
//!
//! Used by tests and local wiring. The invoice store keeps all state behind a
//! single lock, so an issuance (counter allocation plus invoice write) is
//! one critical section, and a failed write leaves the counters untouched.
//! Failures can be injected to exercise rollback and retry paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, IssuerId, PortError,
};

use crate::events::InvoiceEvent;
use crate::invoice::{Counterparty, Invoice, InvoiceStatus};
use crate::ports::{
    BrandingProfile, BrandingProvider, CounterpartyDirectory, CounterpartyRecord, DocumentStore,
    InvoiceQuery, InvoiceStore, IssuanceCommit, IssuanceReceipt, Notification, Notifier,
    ReminderLog, StoredDocument,
};
use crate::reminders::ReminderLogEntry;
use crate::sequence::{SeriesCounters, SeriesKey};

fn healthy(adapter_id: &str) -> HealthCheckResult {
    HealthCheckResult::healthy(adapter_id, 0)
}

#[derive(Debug, Default)]
struct StoreState {
    invoices: HashMap<InvoiceId, Invoice>,
    events: Vec<InvoiceEvent>,
    counters: SeriesCounters,
    reminder_logs: Vec<ReminderLogEntry>,
    fail_next_issuance_write: bool,
    fail_next_reminder_log: bool,
    fail_next_has_sent: bool,
}

impl StoreState {
    fn owned(&self, issuer_id: IssuerId, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.get(&id).filter(|i| i.issuer_id == issuer_id)
    }
}

/// Invoice store and reminder log sharing one state
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    state: Mutex<StoreState>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next issuance fail after its number was allocated
    pub async fn fail_next_issuance_write(&self) {
        self.state.lock().await.fail_next_issuance_write = true;
    }

    /// Makes the next reminder log write fail
    pub async fn fail_next_reminder_log(&self) {
        self.state.lock().await.fail_next_reminder_log = true;
    }

    /// Makes the next reminder log lookup fail
    pub async fn fail_next_has_sent(&self) {
        self.state.lock().await.fail_next_has_sent = true;
    }

    /// Next value the series counter would hand out
    pub async fn next_sequence(&self, issuer_id: IssuerId, key: &SeriesKey) -> i64 {
        self.state.lock().await.counters.peek(issuer_id, key)
    }

    /// Every stored event, across invoices, in insertion order
    pub async fn all_events(&self) -> Vec<InvoiceEvent> {
        self.state.lock().await.events.clone()
    }
}

impl DomainPort for InMemoryInvoiceStore {}

#[async_trait]
impl HealthCheckable for InMemoryInvoiceStore {
    async fn health_check(&self) -> HealthCheckResult {
        healthy("memory-invoice-store")
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice, events: Vec<InvoiceEvent>) -> Result<(), PortError> {
        let mut state = self.state.lock().await;
        if state.invoices.contains_key(&invoice.id) {
            return Err(PortError::conflict(format!("Invoice {} already exists", invoice.id)));
        }
        state.invoices.insert(invoice.id, invoice.clone());
        state.events.extend(events);
        Ok(())
    }

    async fn get(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        Ok(self.state.lock().await.owned(issuer_id, id).cloned())
    }

    async fn list(&self, issuer_id: IssuerId, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let state = self.state.lock().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.issuer_id == issuer_id && query.matches(i))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(invoices.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_open(&self) -> Result<Vec<Invoice>, PortError> {
        let state = self.state.lock().await;
        let mut open: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.status != InvoiceStatus::Draft && !i.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(open)
    }

    async fn save(
        &self,
        invoice: &Invoice,
        expected_version: i64,
        events: Vec<InvoiceEvent>,
    ) -> Result<Invoice, PortError> {
        let mut state = self.state.lock().await;
        let current = state
            .owned(invoice.issuer_id, invoice.id)
            .ok_or_else(|| PortError::not_found("Invoice", invoice.id))?;
        if current.version != expected_version {
            return Err(PortError::conflict(format!(
                "Invoice {} is at version {}, expected {}",
                invoice.id, current.version, expected_version
            )));
        }
        let mut stored = invoice.clone();
        stored.version = expected_version + 1;
        state.invoices.insert(stored.id, stored.clone());
        state.events.extend(events);
        Ok(stored)
    }

    async fn delete_draft(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<bool, PortError> {
        let mut state = self.state.lock().await;
        let is_draft = state
            .owned(issuer_id, id)
            .is_some_and(|i| i.status == InvoiceStatus::Draft);
        if !is_draft {
            return Ok(false);
        }
        state.invoices.remove(&id);
        state.events.retain(|e| e.invoice_id != id);
        Ok(true)
    }

    async fn commit_issuance(&self, commit: IssuanceCommit) -> Result<IssuanceReceipt, PortError> {
        let mut state = self.state.lock().await;
        let current = state
            .owned(commit.issuer_id, commit.invoice_id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", commit.invoice_id))?;

        if current.is_issued() {
            return Ok(IssuanceReceipt::AlreadyIssued(current));
        }
        if current.status != InvoiceStatus::Draft {
            return Ok(IssuanceReceipt::NotDraft(current));
        }
        if current.version != commit.expected_version {
            return Err(PortError::conflict(format!(
                "Invoice {} changed while being issued",
                commit.invoice_id
            )));
        }

        let mut staged = state.counters.clone();
        let number = staged.consume_next(commit.issuer_id, &commit.series_key);
        let write = (commit.finalize)(current, &number);

        if std::mem::take(&mut state.fail_next_issuance_write) {
            return Err(PortError::internal("Injected failure while writing issued invoice"));
        }

        let mut issued = write.invoice;
        issued.version = commit.expected_version + 1;
        state.counters = staged;
        state.invoices.insert(issued.id, issued.clone());
        state.events.extend(write.events);
        Ok(IssuanceReceipt::Issued(issued))
    }

    async fn events(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Vec<InvoiceEvent>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.invoice_id == id && e.issuer_id == issuer_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReminderLog for InMemoryInvoiceStore {
    async fn has_sent(&self, invoice_id: InvoiceId, rule_key: &str) -> Result<bool, PortError> {
        let mut state = self.state.lock().await;
        if std::mem::take(&mut state.fail_next_has_sent) {
            return Err(PortError::connection("Injected reminder log lookup failure"));
        }
        Ok(state
            .reminder_logs
            .iter()
            .any(|e| e.invoice_id == invoice_id && e.rule_key == rule_key))
    }

    async fn record_sent(&self, entry: &ReminderLogEntry, event: InvoiceEvent) -> Result<bool, PortError> {
        let mut state = self.state.lock().await;
        if state
            .reminder_logs
            .iter()
            .any(|e| e.invoice_id == entry.invoice_id && e.rule_key == entry.rule_key)
        {
            return Ok(false);
        }
        if std::mem::take(&mut state.fail_next_reminder_log) {
            return Err(PortError::connection("Injected reminder log failure"));
        }
        state.reminder_logs.push(entry.clone());
        state.events.push(event);
        Ok(true)
    }

    async fn entries(&self, invoice_id: InvoiceId) -> Result<Vec<ReminderLogEntry>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .reminder_logs
            .iter()
            .filter(|e| e.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

/// Counterparty records keyed by issuer
#[derive(Debug, Default)]
pub struct InMemoryCounterpartyDirectory {
    records: RwLock<HashMap<(IssuerId, Counterparty), CounterpartyRecord>>,
}

impl InMemoryCounterpartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a live record
    pub async fn upsert(&self, issuer_id: IssuerId, counterparty: Counterparty, record: CounterpartyRecord) {
        self.records.write().await.insert((issuer_id, counterparty), record);
    }
}

impl DomainPort for InMemoryCounterpartyDirectory {}

#[async_trait]
impl HealthCheckable for InMemoryCounterpartyDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        healthy("memory-counterparty-directory")
    }
}

#[async_trait]
impl CounterpartyDirectory for InMemoryCounterpartyDirectory {
    async fn find_counterparty(
        &self,
        issuer_id: IssuerId,
        counterparty: Counterparty,
    ) -> Result<Option<CounterpartyRecord>, PortError> {
        Ok(self.records.read().await.get(&(issuer_id, counterparty)).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBrandingProvider {
    profiles: RwLock<HashMap<IssuerId, BrandingProfile>>,
}

impl InMemoryBrandingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, issuer_id: IssuerId, profile: BrandingProfile) {
        self.profiles.write().await.insert(issuer_id, profile);
    }
}

impl DomainPort for InMemoryBrandingProvider {}

#[async_trait]
impl BrandingProvider for InMemoryBrandingProvider {
    async fn get_branding(&self, issuer_id: IssuerId) -> Result<Option<BrandingProfile>, PortError> {
        Ok(self.profiles.read().await.get(&issuer_id).cloned())
    }
}

/// Records every notification instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    fail_next: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Successfully delivered notifications
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Send attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DomainPort for RecordingNotifier {}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PortError::unavailable("notifications"));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<InvoiceId, StoredDocument>>,
    puts: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes, overwrites included
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl DomainPort for InMemoryDocumentStore {}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, document: StoredDocument) -> Result<(), PortError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.documents.write().await.insert(document.invoice_id, document);
        Ok(())
    }

    async fn get(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<Option<StoredDocument>, PortError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&invoice_id)
            .filter(|d| d.issuer_id == issuer_id)
            .cloned())
    }

    async fn invalidate(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<(), PortError> {
        let mut documents = self.documents.write().await;
        if documents.get(&invoice_id).is_some_and(|d| d.issuer_id == issuer_id) {
            documents.remove(&invoice_id);
        }
        Ok(())
    }
}
