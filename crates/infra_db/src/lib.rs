//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the invoicing engine, built on SQLx.
//!
//! # Layout
//!
//! - [`repositories`]: SQL, row types and transactions
//! - [`adapters`]: the domain ports implemented over those repositories
//! - [`pool`]: pool construction and embedded migrations
//!
//! # Numbering
//!
//! Issuance locks the draft row, bumps the `invoice_series` counter and
//! writes the issued invoice in a single transaction. The counter row is
//! locked until commit, so concurrent issuances in one series serialize and
//! a rolled-back issuance leaves no gap.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::PostgresInvoiceStore;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/invoicing")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresInvoiceStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{
    PostgresBrandingProvider, PostgresCounterpartyDirectory, PostgresDocumentStore, PostgresInvoiceStore,
    PostgresNotificationOutbox,
};
