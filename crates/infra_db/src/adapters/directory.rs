//! Counterparty directory and issuer branding backed by PostgreSQL

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, IssuerId, PortError};
use domain_invoicing::{BrandingProfile, BrandingProvider, Counterparty, CounterpartyDirectory, CounterpartyRecord};

use crate::repositories::DirectoryRepository;

/// Looks up clients and providers, scoped to the issuer that owns them
#[derive(Debug, Clone)]
pub struct PostgresCounterpartyDirectory {
    repository: DirectoryRepository,
    pool: PgPool,
}

impl PostgresCounterpartyDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DirectoryRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresCounterpartyDirectory {}

#[async_trait]
impl HealthCheckable for PostgresCounterpartyDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-counterparty-directory").await
    }
}

#[async_trait]
impl CounterpartyDirectory for PostgresCounterpartyDirectory {
    async fn find_counterparty(
        &self,
        issuer_id: IssuerId,
        counterparty: Counterparty,
    ) -> Result<Option<CounterpartyRecord>, PortError> {
        let row = match counterparty {
            Counterparty::Client(id) => self.repository.find_client(issuer_id.into(), id.into()).await?,
            Counterparty::Provider(id) => self.repository.find_provider(issuer_id.into(), id.into()).await?,
        };
        Ok(row.map(CounterpartyRecord::from))
    }
}

/// Reads the issuer profile used for company snapshots and draft defaults
#[derive(Debug, Clone)]
pub struct PostgresBrandingProvider {
    repository: DirectoryRepository,
}

impl PostgresBrandingProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DirectoryRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresBrandingProvider {}

#[async_trait]
impl BrandingProvider for PostgresBrandingProvider {
    async fn get_branding(&self, issuer_id: IssuerId) -> Result<Option<BrandingProfile>, PortError> {
        let row = self.repository.find_issuer_profile(issuer_id.into()).await?;
        Ok(row.map(BrandingProfile::from))
    }
}
