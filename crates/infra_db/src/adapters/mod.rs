//! Domain Adapters
//!
//! PostgreSQL implementations of the invoicing ports. Each adapter wraps a
//! repository, turns [`DatabaseError`] into `PortError` and exposes a
//! connectivity health check.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresInvoiceStore;
//!
//! let store = Arc::new(PostgresInvoiceStore::new(pool.clone()));
//! let reminders = ReminderService::new(store.clone(), store.clone(), notifier, directory, clock, timezone, rules);
//! ```
//!
//! [`DatabaseError`]: crate::DatabaseError

pub mod invoice_store;
pub mod directory;
pub mod documents;
pub mod outbox;

pub use invoice_store::PostgresInvoiceStore;
pub use directory::{PostgresBrandingProvider, PostgresCounterpartyDirectory};
pub use documents::PostgresDocumentStore;
pub use outbox::PostgresNotificationOutbox;

use core_kernel::HealthCheckResult;
use sqlx::PgPool;

/// Runs `SELECT 1` against the pool and reports the round trip
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("Database error: {}", e)),
    }
}
