//! Scheduled reminder sweep
//!
//! The sweep is idempotent per (invoice, rule), so a tick that overlaps a
//! restart or a second instance cannot send a reminder twice once it has
//! been logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use domain_invoicing::{ReminderService, SweepReport};

/// Runs one sweep, logging the outcome
pub async fn run_sweep_once(reminders: &ReminderService) -> Option<SweepReport> {
    match reminders.run_sweep().await {
        Ok(report) => {
            info!(
                evaluated = report.evaluated,
                status_refreshed = report.status_refreshed,
                due = report.due,
                sent = report.sent,
                already_sent = report.already_sent,
                send_failures = report.send_failures,
                log_failures = report.log_failures,
                errors = report.errors,
                "Reminder sweep finished"
            );
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, "Reminder sweep failed");
            None
        }
    }
}

/// Sweeps every `every`, starting immediately; late ticks are skipped
pub fn spawn_reminder_sweep(reminders: Arc<ReminderService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_sweep_once(&reminders).await;
        }
    })
}
