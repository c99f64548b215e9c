//! Invoicing domain errors

use thiserror::Error;

use core_kernel::{InvoiceId, MoneyError, PortError};

use crate::invoice::InvoiceStatus;

/// Errors that can occur in the invoicing domain
#[derive(Debug, Error)]
pub enum InvoicingError {
    /// One or more human-readable validation messages
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Operation not permitted in the invoice's current status
    #[error("Cannot {operation} invoice {invoice_id} in status {status}")]
    InvalidState {
        invoice_id: InvoiceId,
        status: InvoiceStatus,
        operation: &'static str,
    },

    /// Invoice not found for this issuer
    #[error("Invoice not found: {0}")]
    NotFound(InvoiceId),

    /// The sequence allocator failed; nothing was issued
    #[error("Could not assign invoice number, retry: {0}")]
    Allocation(String),

    /// The invoice changed between read and write
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Monetary arithmetic failed
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),

    /// Infrastructure failure behind a port
    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

impl InvoicingError {
    pub fn validation(message: impl Into<String>) -> Self {
        InvoicingError::Validation(vec![message.into()])
    }

    pub fn invalid_state(invoice_id: InvoiceId, status: InvoiceStatus, operation: &'static str) -> Self {
        InvoicingError::InvalidState {
            invoice_id,
            status,
            operation,
        }
    }

    /// Messages when this is a validation error
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            InvoicingError::Validation(messages) => Some(messages),
            _ => None,
        }
    }

    /// Stale-version conflicts surface as `Conflict`, everything else stays a port error
    pub(crate) fn from_write(error: PortError) -> Self {
        if error.is_conflict() {
            InvoicingError::Conflict(error.to_string())
        } else {
            InvoicingError::Port(error)
        }
    }
}
