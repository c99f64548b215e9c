//! In-memory wiring
//!
//! Assembles the lifecycle and reminder services over the mock adapters,
//! driven by a [`FixedClock`] so tests control "today".

use std::sync::Arc;

use chrono::NaiveDate;
use core_kernel::{Clock, FixedClock, InvoiceId, IssuerId, Timezone};
use domain_invoicing::mock::{
    InMemoryBrandingProvider, InMemoryCounterpartyDirectory, InMemoryDocumentStore,
    InMemoryInvoiceStore, RecordingNotifier,
};
use domain_invoicing::{
    BrandingProfile, Counterparty, CounterpartyRecord, DocumentPipeline, DocumentStore, DraftSpec, Invoice,
    InvoiceService, InvoicingSettings, JsonDocumentRenderer, ReminderService,
};

use crate::builders::DraftSpecBuilder;
use crate::fixtures::{BrandingFixtures, CounterpartyFixtures, TemporalFixtures};

/// Everything a test needs to drive the engine
pub struct TestHarness {
    pub issuer_id: IssuerId,
    pub clock: Arc<FixedClock>,
    pub store: Arc<InMemoryInvoiceStore>,
    pub directory: Arc<InMemoryCounterpartyDirectory>,
    pub branding: Arc<InMemoryBrandingProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub service: Arc<InvoiceService>,
    pub reminders: Arc<ReminderService>,
}

impl TestHarness {
    /// Harness at [`TemporalFixtures::today`] with a fully branded issuer
    pub async fn new() -> Self {
        Self::with_settings(InvoicingSettings::default()).await
    }

    pub async fn with_settings(settings: InvoicingSettings) -> Self {
        let issuer_id = IssuerId::new();
        let clock = Arc::new(FixedClock::on_date(TemporalFixtures::today()));
        let store = Arc::new(InMemoryInvoiceStore::new());
        let directory = Arc::new(InMemoryCounterpartyDirectory::new());
        let branding = Arc::new(InMemoryBrandingProvider::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let documents = Arc::new(InMemoryDocumentStore::new());

        branding.upsert(issuer_id, BrandingFixtures::studio()).await;

        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let pipeline = DocumentPipeline::new(Arc::new(JsonDocumentRenderer), documents.clone(), dyn_clock.clone());
        let timezone: Timezone = settings.timezone;
        let rules = settings.reminder_rules.clone();

        let service = Arc::new(InvoiceService::new(
            store.clone(),
            directory.clone(),
            branding.clone(),
            pipeline,
            dyn_clock.clone(),
            settings,
        ));
        let reminders = Arc::new(ReminderService::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            directory.clone(),
            dyn_clock,
            timezone,
            rules,
        ));

        Self {
            issuer_id,
            clock,
            store,
            directory,
            branding,
            notifier,
            documents,
            service,
            reminders,
        }
    }

    /// Moves the clock to noon UTC on `date`
    pub fn set_today(&self, date: NaiveDate) {
        self.clock.set(date.and_hms_opt(12, 0, 0).unwrap().and_utc());
    }

    pub async fn set_branding(&self, profile: BrandingProfile) {
        self.branding.upsert(self.issuer_id, profile).await;
    }

    /// Registers a client with complete fiscal data
    pub async fn add_client(&self) -> Counterparty {
        self.add_counterparty(CounterpartyFixtures::new_client(), CounterpartyFixtures::acme()).await
    }

    pub async fn add_counterparty(&self, counterparty: Counterparty, record: CounterpartyRecord) -> Counterparty {
        self.directory.upsert(self.issuer_id, counterparty, record).await;
        counterparty
    }

    /// Creates a draft for a fresh, complete client
    pub async fn draft(&self) -> Invoice {
        let client = self.add_client().await;
        self.draft_from(DraftSpecBuilder::customer(client).build()).await
    }

    pub async fn draft_from(&self, spec: DraftSpec) -> Invoice {
        self.service
            .create_invoice(self.issuer_id, spec)
            .await
            .expect("draft creation should succeed")
    }

    /// Creates and issues a draft for a fresh, complete client
    pub async fn issued(&self) -> Invoice {
        let draft = self.draft().await;
        self.issue(&draft).await
    }

    pub async fn issue(&self, draft: &Invoice) -> Invoice {
        self.service
            .issue_invoice(self.issuer_id, draft.id)
            .await
            .expect("issuance should succeed")
            .into_invoice()
    }

    /// Whether a rendered document is cached for the invoice
    pub async fn documents_has(&self, id: InvoiceId) -> bool {
        matches!(self.documents.get(self.issuer_id, id).await, Ok(Some(_)))
    }
}
