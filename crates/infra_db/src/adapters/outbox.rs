//! Notification outbox
//!
//! Reminders are not mailed from this process. They are written to
//! `notification_outbox` and a relay delivers them, so a successful `send`
//! means the message is durably queued.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{DomainPort, PortError};
use domain_invoicing::{Notification, NotificationChannel, Notifier};

use crate::error::DatabaseError;

fn channel_name(channel: NotificationChannel) -> &'static str {
    match channel {
        NotificationChannel::Email => "email",
    }
}

#[derive(Debug, Clone)]
pub struct PostgresNotificationOutbox {
    pool: PgPool,
}

impl PostgresNotificationOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Number of queued messages the relay has not delivered yet
    pub async fn pending(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notification_outbox WHERE delivered_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

impl DomainPort for PostgresNotificationOutbox {}

#[async_trait]
impl Notifier for PostgresNotificationOutbox {
    async fn send(&self, notification: &Notification) -> Result<(), PortError> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO notification_outbox (notification_id, channel, recipient, template, data) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(channel_name(notification.channel))
        .bind(&notification.recipient)
        .bind(&notification.template)
        .bind(&notification.data)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        debug!(notification_id = %id, template = %notification.template, "Notification queued");
        Ok(())
    }
}
