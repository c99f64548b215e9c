//! Counterparty and issuer profile lookups
//!
//! Read-only from the invoicing side; the rows are maintained by the
//! customer and settings modules.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use domain_invoicing::{BrandingProfile, CounterpartyRecord};

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct CounterpartyRow {
    pub name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
}

impl From<CounterpartyRow> for CounterpartyRecord {
    fn from(row: CounterpartyRow) -> Self {
        CounterpartyRecord {
            name: row.name,
            legal_name: row.legal_name,
            tax_id: row.tax_id,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            country: row.country,
            email: row.email,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct IssuerProfileRow {
    pub company_name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub legal_footer: Option<String>,
    pub payment_conditions: Option<String>,
    pub logo_url: Option<String>,
    pub default_notes_template: Option<String>,
    pub default_terms_template: Option<String>,
}

impl From<IssuerProfileRow> for BrandingProfile {
    fn from(row: IssuerProfileRow) -> Self {
        BrandingProfile {
            company_name: row.company_name,
            tax_id: row.tax_id,
            address: row.address,
            email: row.email,
            phone: row.phone,
            legal_footer: row.legal_footer,
            payment_conditions: row.payment_conditions,
            logo_url: row.logo_url,
            default_notes_template: row.default_notes_template,
            default_terms_template: row.default_terms_template,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_client(&self, issuer_id: Uuid, client_id: Uuid) -> Result<Option<CounterpartyRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CounterpartyRow>(
            "SELECT name, legal_name, tax_id, address, city, postal_code, country, email \
             FROM clients WHERE client_id = $1 AND issuer_id = $2",
        )
        .bind(client_id)
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_provider(
        &self,
        issuer_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<CounterpartyRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CounterpartyRow>(
            "SELECT name, legal_name, tax_id, address, city, postal_code, country, email \
             FROM providers WHERE provider_id = $1 AND issuer_id = $2",
        )
        .bind(provider_id)
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_issuer_profile(&self, issuer_id: Uuid) -> Result<Option<IssuerProfileRow>, DatabaseError> {
        let row = sqlx::query_as::<_, IssuerProfileRow>(
            "SELECT company_name, tax_id, address, email, phone, legal_footer, payment_conditions, \
                    logo_url, default_notes_template, default_terms_template \
             FROM issuer_profiles WHERE issuer_id = $1",
        )
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
