//! Reminder log repository
//!
//! The unique key on (invoice_id, rule_key) makes `record_sent` idempotent:
//! a second sweep over the same invoice and rule inserts nothing.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{InvoiceId, IssuerId, ReminderLogId};
use domain_invoicing::{InvoiceEvent, ReminderLogEntry};

use crate::error::DatabaseError;
use crate::repositories::invoices::insert_events;

#[derive(Debug, Clone, FromRow)]
pub struct ReminderLogRow {
    pub log_id: Uuid,
    pub invoice_id: Uuid,
    pub issuer_id: Uuid,
    pub rule_key: String,
    pub offset_days: i64,
    pub sent_at: DateTime<Utc>,
}

impl From<ReminderLogRow> for ReminderLogEntry {
    fn from(row: ReminderLogRow) -> Self {
        ReminderLogEntry {
            id: ReminderLogId::from_uuid(row.log_id),
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            issuer_id: IssuerId::from_uuid(row.issuer_id),
            rule_key: row.rule_key,
            offset_days: row.offset_days,
            sent_at: row.sent_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderLogRepository {
    pool: PgPool,
}

impl ReminderLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn has_sent(&self, invoice_id: InvoiceId, rule_key: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM invoice_reminder_logs WHERE invoice_id = $1 AND rule_key = $2)",
        )
        .bind(Uuid::from(invoice_id))
        .bind(rule_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Inserts the log row and, only if it was new, the audit event
    pub async fn record_sent(&self, entry: &ReminderLogEntry, event: &InvoiceEvent) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO invoice_reminder_logs (log_id, invoice_id, issuer_id, rule_key, offset_days, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (invoice_id, rule_key) DO NOTHING",
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.invoice_id))
        .bind(Uuid::from(entry.issuer_id))
        .bind(&entry.rule_key)
        .bind(entry.offset_days)
        .bind(entry.sent_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            insert_events(&mut *tx, std::slice::from_ref(event)).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn entries(&self, invoice_id: InvoiceId) -> Result<Vec<ReminderLogEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, ReminderLogRow>(
            "SELECT log_id, invoice_id, issuer_id, rule_key, offset_days, sent_at \
             FROM invoice_reminder_logs WHERE invoice_id = $1 ORDER BY sent_at, log_id",
        )
        .bind(Uuid::from(invoice_id))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReminderLogEntry::from).collect())
    }
}
