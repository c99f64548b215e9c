//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for counterparties, branding and dates.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, IssuerId, ProviderId};
use domain_invoicing::{BrandingProfile, Counterparty, CounterpartyRecord, LineSpec};

/// Fixture for counterparty records
pub struct CounterpartyFixtures;

impl CounterpartyFixtures {
    /// A client with complete fiscal data
    pub fn acme() -> CounterpartyRecord {
        CounterpartyRecord {
            name: "Acme".to_string(),
            legal_name: Some("Acme Industries SL".to_string()),
            tax_id: Some("B12345678".to_string()),
            address: Some("Calle Mayor 1".to_string()),
            city: Some("Madrid".to_string()),
            postal_code: Some("28001".to_string()),
            country: Some("ES".to_string()),
            email: Some("billing@acme.test".to_string()),
        }
    }

    /// A client missing its tax identifier and address
    pub fn incomplete() -> CounterpartyRecord {
        CounterpartyRecord {
            name: "Walk-in Customer".to_string(),
            legal_name: None,
            tax_id: None,
            address: None,
            city: None,
            postal_code: None,
            country: None,
            email: None,
        }
    }

    /// A provider with complete fiscal data
    pub fn supplier() -> CounterpartyRecord {
        CounterpartyRecord {
            name: "Paper Supplies".to_string(),
            legal_name: Some("Paper Supplies SA".to_string()),
            tax_id: Some("A87654321".to_string()),
            address: Some("Avenida Diagonal 100".to_string()),
            city: Some("Barcelona".to_string()),
            postal_code: Some("08019".to_string()),
            country: Some("ES".to_string()),
            email: Some("invoices@paper.test".to_string()),
        }
    }

    pub fn new_client() -> Counterparty {
        Counterparty::Client(ClientId::new())
    }

    pub fn new_provider() -> Counterparty {
        Counterparty::Provider(ProviderId::new())
    }
}

/// Fixture for issuer branding
pub struct BrandingFixtures;

impl BrandingFixtures {
    /// An issuer with complete fiscal data and default templates
    pub fn studio() -> BrandingProfile {
        BrandingProfile {
            company_name: "Studio Norte SL".to_string(),
            tax_id: Some("B99887766".to_string()),
            address: Some("Gran Via 28, Madrid".to_string()),
            email: Some("hello@studionorte.test".to_string()),
            phone: Some("+34 600 000 000".to_string()),
            legal_footer: Some("Registered in Madrid, tome 1234".to_string()),
            payment_conditions: Some("Bank transfer to ES00 0000 0000 0000".to_string()),
            logo_url: None,
            default_notes_template: Some("Thank you for your business.".to_string()),
            default_terms_template: Some("Payment due within 30 days.".to_string()),
        }
    }

    /// An issuer that has not filled in its tax identifier
    pub fn without_tax_id() -> BrandingProfile {
        BrandingProfile {
            tax_id: None,
            ..Self::studio()
        }
    }
}

/// Fixture for dates used across scenarios
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
    }

    /// Noon UTC on the given day
    pub fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    /// Default "today" of the harness
    pub fn today() -> NaiveDate {
        Self::date(2026, 3, 2)
    }
}

/// Fixture for line items
pub struct LineFixtures;

impl LineFixtures {
    /// 2 x 100.00 at 21% (subtotal 200.00, tax 42.00, total 242.00)
    pub fn consulting() -> LineSpec {
        LineSpec::base("Consulting hours", dec!(2), dec!(100), dec!(21))
    }

    /// 121.00 tax-inclusive at 21%
    pub fn licence_tax_inclusive() -> LineSpec {
        LineSpec::tax_inclusive("Annual licence", Decimal::ONE, dec!(121), dec!(21))
    }

    pub fn priced(description: &str, quantity: Decimal, unit_price: Decimal) -> LineSpec {
        LineSpec::base(description, quantity, unit_price, dec!(21))
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn issuer() -> IssuerId {
        IssuerId::new()
    }
}
