//! Issuance snapshots
//!
//! At issuance the engine freezes copies of the issuer's branding, the
//! counterparty's fiscal data, the line items and the totals. Documents for
//! an issued invoice are produced from these copies only, so later edits to
//! client records or branding never alter an issued invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Currency;

use crate::invoice::Counterparty;
use crate::ports::{BrandingProfile, CounterpartyRecord};
use crate::totals::InvoiceTotals;

/// Issuer data as of issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub company_name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub legal_footer: Option<String>,
    pub payment_conditions: Option<String>,
    pub logo_url: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl CompanySnapshot {
    pub fn capture(branding: &BrandingProfile, at: DateTime<Utc>) -> Self {
        Self {
            company_name: branding.company_name.clone(),
            tax_id: branding.tax_id.clone(),
            address: branding.address.clone(),
            email: branding.email.clone(),
            phone: branding.phone.clone(),
            legal_footer: branding.legal_footer.clone(),
            payment_conditions: branding.payment_conditions.clone(),
            logo_url: branding.logo_url.clone(),
            captured_at: at,
        }
    }
}

/// Counterparty data as of issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartySnapshot {
    pub counterparty: Counterparty,
    pub name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl CounterpartySnapshot {
    pub fn capture(counterparty: Counterparty, record: &CounterpartyRecord, at: DateTime<Utc>) -> Self {
        Self {
            counterparty,
            name: record.name.clone(),
            legal_name: record.legal_name.clone(),
            tax_id: record.tax_id.clone(),
            address: record.address.clone(),
            city: record.city.clone(),
            postal_code: record.postal_code.clone(),
            country: record.country.clone(),
            email: record.email.clone(),
            captured_at: at,
        }
    }

    /// Name to print: legal name when known
    pub fn display_name(&self) -> &str {
        self.legal_name.as_deref().unwrap_or(&self.name)
    }
}

/// A line item as of issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub position: u32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub tax_percent: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Totals as of issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsSnapshot {
    pub currency: Currency,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl TotalsSnapshot {
    pub fn capture(currency: Currency, totals: InvoiceTotals) -> Self {
        Self {
            currency,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total: totals.total,
        }
    }
}
