//! Invoice audit trail
//!
//! Every lifecycle transition appends an event. Events are never mutated or
//! deleted; together they form the ordered history of an invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

use core_kernel::{InvoiceEventId, InvoiceId, IssuerId};

/// Event type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceEventType {
    Created,
    Edited,
    Sent,
    Viewed,
    Payment,
    Paid,
    Canceled,
    ReminderSent,
    Rectifies,
    RectificationIssued,
}

impl InvoiceEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceEventType::Created => "CREATED",
            InvoiceEventType::Edited => "EDITED",
            InvoiceEventType::Sent => "SENT",
            InvoiceEventType::Viewed => "VIEWED",
            InvoiceEventType::Payment => "PAYMENT",
            InvoiceEventType::Paid => "PAID",
            InvoiceEventType::Canceled => "CANCELED",
            InvoiceEventType::ReminderSent => "REMINDER_SENT",
            InvoiceEventType::Rectifies => "RECTIFIES",
            InvoiceEventType::RectificationIssued => "RECTIFICATION_ISSUED",
        }
    }
}

impl FromStr for InvoiceEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(InvoiceEventType::Created),
            "EDITED" => Ok(InvoiceEventType::Edited),
            "SENT" => Ok(InvoiceEventType::Sent),
            "VIEWED" => Ok(InvoiceEventType::Viewed),
            "PAYMENT" => Ok(InvoiceEventType::Payment),
            "PAID" => Ok(InvoiceEventType::Paid),
            "CANCELED" => Ok(InvoiceEventType::Canceled),
            "REMINDER_SENT" => Ok(InvoiceEventType::ReminderSent),
            "RECTIFIES" => Ok(InvoiceEventType::Rectifies),
            "RECTIFICATION_ISSUED" => Ok(InvoiceEventType::RectificationIssued),
            other => Err(format!("Unknown invoice event type: {}", other)),
        }
    }
}

/// One entry of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceEvent {
    pub id: InvoiceEventId,
    pub invoice_id: InvoiceId,
    pub issuer_id: IssuerId,
    pub event_type: InvoiceEventType,
    pub metadata: Value,
    pub occurred_at: DateTime<Utc>,
}

impl InvoiceEvent {
    pub fn new(
        issuer_id: IssuerId,
        invoice_id: InvoiceId,
        event_type: InvoiceEventType,
        metadata: Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceEventId::new_v7(),
            invoice_id,
            issuer_id,
            event_type,
            metadata,
            occurred_at,
        }
    }

    /// Event without metadata
    pub fn bare(issuer_id: IssuerId, invoice_id: InvoiceId, event_type: InvoiceEventType, at: DateTime<Utc>) -> Self {
        Self::new(issuer_id, invoice_id, event_type, json!({}), at)
    }
}
