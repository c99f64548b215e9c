//! Payment recording
//!
//! Payments are append-only; their sum is what drives the derived status of
//! an invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{InvoiceId, Money, PaymentId};

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    DirectDebit,
    Cash,
    Check,
    DigitalWallet,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::DirectDebit => "direct_debit",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::DigitalWallet => "digital_wallet",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "card" => Ok(PaymentMethod::Card),
            "direct_debit" => Ok(PaymentMethod::DirectDebit),
            "cash" => Ok(PaymentMethod::Cash),
            "check" => Ok(PaymentMethod::Check),
            "digital_wallet" => Ok(PaymentMethod::DigitalWallet),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

/// A payment recorded against an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// External reference (bank ref, card transaction id)
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payment as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the current instant
    pub paid_at: Option<DateTime<Utc>>,
}

impl NewPayment {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            reference: None,
            notes: None,
            paid_at: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    /// Validation messages for this payment against an invoice currency
    pub fn validate(&self, invoice_currency: core_kernel::Currency) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.amount.is_positive() {
            errors.push("Payment amount must be greater than zero".to_string());
        }
        if self.amount.currency() != invoice_currency {
            errors.push(format!(
                "Payment currency {} does not match invoice currency {}",
                self.amount.currency(),
                invoice_currency
            ));
        }
        errors
    }

    pub(crate) fn into_payment(self, invoice_id: InvoiceId, now: DateTime<Utc>) -> InvoicePayment {
        InvoicePayment {
            id: PaymentId::new_v7(),
            invoice_id,
            amount: self.amount,
            method: self.method,
            reference: self.reference,
            notes: self.notes,
            paid_at: self.paid_at.unwrap_or(now),
            created_at: now,
        }
    }
}
