//! Port plumbing shared by every adapter
//!
//! The invoice store, counterparty directory, branding profile, notifier and
//! document renderer all report failures as [`PortError`]. Invoicing only
//! asks three questions of a failure: is the target missing, did a write lose
//! a version race, and may a later retry succeed. The variants are shaped
//! around those questions rather than around any backing technology.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// The backend refused the data (constraint or foreign key)
    #[error("Rejected by storage: {message}")]
    Validation { message: String },

    /// Stale version or a unique key already taken
    #[error("Write conflict: {message}")]
    Conflict { message: String },

    #[error("Backend unreachable: {message}")]
    Connection { message: String },

    /// The backend is up but cannot take more work right now
    #[error("{backend} is saturated, retry later")]
    Unavailable { backend: String },

    #[error("Adapter failure: {message}")]
    Internal { message: String },
}

impl PortError {
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection { message: message.into() }
    }

    pub fn unavailable(backend: impl Into<String>) -> Self {
        PortError::Unavailable { backend: backend.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal { message: message.into() }
    }

    /// Reminder sweeps and outbox drains leave these for the next run
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. } | PortError::Unavailable { .. })
    }

    /// Optimistic writes surface lost races this way
    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Bound shared by every port so adapters can sit behind `Arc<dyn _>`
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// One adapter's answer to the readiness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn healthy(adapter_id: &str, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(adapter_id: &str, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
