//! Fiscal completeness
//!
//! An invoice may only be issued when both the issuer and the counterparty
//! carry the minimal fiscal data required on a legal invoice.

use serde::{Deserialize, Serialize};

use crate::ports::{BrandingProfile, CounterpartyRecord};
use crate::snapshot::CounterpartySnapshot;

/// Which fields must be present before issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalRequirements {
    pub legal_name: bool,
    pub tax_id: bool,
    pub address: bool,
}

impl Default for FiscalRequirements {
    fn default() -> Self {
        Self {
            legal_name: true,
            tax_id: true,
            address: true,
        }
    }
}

/// An entity that appears on an invoice with fiscal data
pub trait FiscalEntity {
    /// Label used in messages, e.g. "Issuer"
    fn role(&self) -> &'static str;
    fn legal_name(&self) -> Option<&str>;
    fn tax_id(&self) -> Option<&str>;
    fn address(&self) -> Option<&str>;
}

impl FiscalEntity for BrandingProfile {
    fn role(&self) -> &'static str {
        "Issuer"
    }

    fn legal_name(&self) -> Option<&str> {
        Some(self.company_name.as_str())
    }

    fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl FiscalEntity for CounterpartyRecord {
    fn role(&self) -> &'static str {
        "Counterparty"
    }

    fn legal_name(&self) -> Option<&str> {
        self.legal_name.as_deref().or(Some(self.name.as_str()))
    }

    fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl FiscalEntity for CounterpartySnapshot {
    fn role(&self) -> &'static str {
        "Counterparty"
    }

    fn legal_name(&self) -> Option<&str> {
        Some(self.display_name())
    }

    fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Human-readable list of the required fields the entity lacks
pub fn missing_fiscal_fields(entity: &dyn FiscalEntity, requirements: &FiscalRequirements) -> Vec<String> {
    let mut missing = Vec::new();
    if requirements.legal_name && is_blank(entity.legal_name()) {
        missing.push(format!("{} legal name is missing", entity.role()));
    }
    if requirements.tax_id && is_blank(entity.tax_id()) {
        missing.push(format!("{} tax identifier is missing", entity.role()));
    }
    if requirements.address && is_blank(entity.address()) {
        missing.push(format!("{} address is missing", entity.role()));
    }
    missing
}

pub fn is_fiscally_complete(entity: &dyn FiscalEntity, requirements: &FiscalRequirements) -> bool {
    missing_fiscal_fields(entity, requirements).is_empty()
}
