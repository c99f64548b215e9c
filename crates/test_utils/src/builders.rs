//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out what matters.

use chrono::NaiveDate;

use core_kernel::Currency;
use domain_invoicing::{Counterparty, DraftSpec, InvoiceOrigin, InvoiceType, LineSpec, PricingMode};

use crate::fixtures::{LineFixtures, TemporalFixtures};

/// Builder for draft specifications
///
/// Defaults to a customer invoice in EUR, issued today (per
/// [`TemporalFixtures::today`]) and due 30 days later, with one 242.00 line.
pub struct DraftSpecBuilder {
    spec: DraftSpec,
}

impl DraftSpecBuilder {
    pub fn customer(client: Counterparty) -> Self {
        let issue_date = TemporalFixtures::today();
        Self {
            spec: DraftSpec {
                invoice_type: InvoiceType::Customer,
                counterparty: Some(client),
                origin: InvoiceOrigin::None,
                series: None,
                issue_date,
                due_date: issue_date + chrono::Duration::days(30),
                service_date: None,
                currency: Currency::EUR,
                pricing_mode: PricingMode::Base,
                lines: vec![LineFixtures::consulting()],
                notes: None,
                terms: None,
                payment_method: None,
                payment_details: None,
            },
        }
    }

    pub fn vendor(provider: Option<Counterparty>) -> Self {
        let mut builder = Self::customer(Counterparty::Client(core_kernel::ClientId::new()));
        builder.spec.invoice_type = InvoiceType::Vendor;
        builder.spec.counterparty = provider;
        builder
    }

    pub fn issue_date(mut self, date: NaiveDate) -> Self {
        self.spec.issue_date = date;
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.spec.due_date = date;
        self
    }

    pub fn lines(mut self, lines: Vec<LineSpec>) -> Self {
        self.spec.lines = lines;
        self
    }

    pub fn pricing_mode(mut self, mode: PricingMode) -> Self {
        self.spec.pricing_mode = mode;
        self
    }

    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.spec.series = Some(series.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.spec.notes = Some(notes.into());
        self
    }

    pub fn origin(mut self, origin: InvoiceOrigin) -> Self {
        self.spec.origin = origin;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.spec.currency = currency;
        self
    }

    pub fn build(self) -> DraftSpec {
        self.spec
    }
}
