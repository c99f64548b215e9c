//! Payment reminders
//!
//! A fixed table of rules fires relative to the due date (3 days before, on
//! the day, and 1, 3 and 7 days after). [`reminders_for_date`] is the pure
//! decision step; [`ReminderService`] runs the daily sweep, consulting the
//! [`ReminderLog`] so each (invoice, rule) pair is sent at most once.
//!
//! Delivery is best-effort. A failed send writes nothing and is retried on
//! the next run that day; a send whose log write fails may be repeated, which
//! is preferred over losing the reminder.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Clock, InvoiceId, IssuerId, ReminderLogId, Timezone};

use crate::due::{compute_invoice_due_info, DueInfo};
use crate::error::InvoicingError;
use crate::events::{InvoiceEvent, InvoiceEventType};
use crate::invoice::{recompute_status, Invoice, InvoiceStatus};
use crate::ports::{
    CounterpartyDirectory, InvoiceStore, Notification, NotificationChannel, Notifier, ReminderLog,
};

/// Template handed to the notification boundary
pub const REMINDER_TEMPLATE: &str = "invoice_reminder";

/// Fires when an invoice is exactly `offset_days` past its due date
/// (negative offsets fire before it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRule {
    pub key: String,
    pub offset_days: i64,
}

impl ReminderRule {
    pub fn new(key: impl Into<String>, offset_days: i64) -> Self {
        Self {
            key: key.into(),
            offset_days,
        }
    }
}

/// The configured rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderRules(Vec<ReminderRule>);

impl Default for ReminderRules {
    fn default() -> Self {
        Self(vec![
            ReminderRule::new("before_3", -3),
            ReminderRule::new("due_day", 0),
            ReminderRule::new("after_1", 1),
            ReminderRule::new("after_3", 3),
            ReminderRule::new("after_7", 7),
        ])
    }
}

impl ReminderRules {
    /// Builds a table, rejecting an empty table and duplicate keys
    pub fn new(rules: Vec<ReminderRule>) -> Result<Self, InvoicingError> {
        let mut errors = Vec::new();
        if rules.is_empty() {
            errors.push("At least one reminder rule is required".to_string());
        }
        for (i, rule) in rules.iter().enumerate() {
            if rule.key.trim().is_empty() {
                errors.push(format!("Reminder rule {} has an empty key", i + 1));
            }
            if rules[..i].iter().any(|r| r.key == rule.key) {
                errors.push(format!("Duplicate reminder rule key: {}", rule.key));
            }
        }
        if errors.is_empty() {
            Ok(Self(rules))
        } else {
            Err(InvoicingError::Validation(errors))
        }
    }

    pub fn rules(&self) -> &[ReminderRule] {
        &self.0
    }

    /// Rules whose offset matches the given day offset
    pub fn matching(&self, day_offset: i64) -> impl Iterator<Item = &ReminderRule> {
        self.0.iter().filter(move |r| r.offset_days == day_offset)
    }
}

/// A reminder that is due to fire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub invoice_id: InvoiceId,
    pub issuer_id: IssuerId,
    pub number: String,
    pub rule_key: String,
    /// Days past due (negative before the due date)
    pub offset_days: i64,
    pub due_date: NaiveDate,
    pub due: DueInfo,
}

/// One successful send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderLogEntry {
    pub id: ReminderLogId,
    pub invoice_id: InvoiceId,
    pub issuer_id: IssuerId,
    pub rule_key: String,
    pub offset_days: i64,
    pub sent_at: DateTime<Utc>,
}

fn is_remindable(status: InvoiceStatus) -> bool {
    !matches!(status, InvoiceStatus::Draft | InvoiceStatus::Paid | InvoiceStatus::Canceled)
}

/// Selects the reminders that fire on `today`
///
/// Drafts and settled invoices never get reminders. The log is not
/// consulted here.
pub fn reminders_for_date(invoices: &[Invoice], today: NaiveDate, rules: &ReminderRules) -> Vec<ReminderCandidate> {
    let mut candidates = Vec::new();
    for invoice in invoices.iter().filter(|i| is_remindable(i.status)) {
        let due = compute_invoice_due_info(invoice, today);
        let Some(diff) = due.diff_days else {
            continue;
        };
        let day_offset = -diff;
        for rule in rules.matching(day_offset) {
            candidates.push(ReminderCandidate {
                invoice_id: invoice.id,
                issuer_id: invoice.issuer_id,
                number: invoice.number.clone(),
                rule_key: rule.key.clone(),
                offset_days: day_offset,
                due_date: invoice.due_date,
                due,
            });
        }
    }
    candidates
}

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub evaluated: usize,
    pub status_refreshed: usize,
    pub due: usize,
    pub sent: usize,
    pub already_sent: usize,
    pub no_recipient: usize,
    pub send_failures: usize,
    /// Sent but not logged; may be sent again on the next run
    pub log_failures: usize,
    /// Invoices or rules skipped after a lookup or refresh error; retried next run
    pub errors: usize,
}

/// Runs the daily reminder sweep
pub struct ReminderService {
    store: Arc<dyn InvoiceStore>,
    log: Arc<dyn ReminderLog>,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn CounterpartyDirectory>,
    clock: Arc<dyn Clock>,
    timezone: Timezone,
    rules: ReminderRules,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        log: Arc<dyn ReminderLog>,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn CounterpartyDirectory>,
        clock: Arc<dyn Clock>,
        timezone: Timezone,
        rules: ReminderRules,
    ) -> Self {
        Self {
            store,
            log,
            notifier,
            directory,
            clock,
            timezone,
            rules,
        }
    }

    pub fn rules(&self) -> &ReminderRules {
        &self.rules
    }

    /// Evaluates every open invoice once
    ///
    /// Invoices are processed one at a time and, within an invoice, rules in
    /// table order, so the log check for a rule never races its own write.
    #[instrument(skip(self))]
    pub async fn run_sweep(&self) -> Result<SweepReport, InvoicingError> {
        let today = self.timezone.today(self.clock.as_ref());
        let invoices = self.store.list_open().await?;
        let mut report = SweepReport::default();

        for invoice in invoices {
            report.evaluated += 1;
            let invoice_id = invoice.id;
            let invoice = match self.refresh_status(invoice, today).await {
                Ok((invoice, changed)) => {
                    if changed {
                        report.status_refreshed += 1;
                    }
                    invoice
                }
                Err(e) => {
                    warn!(invoice_id = %invoice_id, error = %e, "Skipping invoice whose status could not be refreshed");
                    report.errors += 1;
                    continue;
                }
            };

            for candidate in reminders_for_date(std::slice::from_ref(&invoice), today, &self.rules) {
                report.due += 1;
                if let Err(e) = self.fire(&invoice, &candidate, &mut report).await {
                    warn!(
                        invoice_id = %invoice.id,
                        rule = %candidate.rule_key,
                        error = %e,
                        "Reminder skipped; will retry next run"
                    );
                    report.errors += 1;
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            sent = report.sent,
            already_sent = report.already_sent,
            send_failures = report.send_failures,
            errors = report.errors,
            "Reminder sweep finished"
        );
        Ok(report)
    }

    /// Persists a time-driven status change such as `SENT` to `OVERDUE`
    async fn refresh_status(&self, invoice: Invoice, today: NaiveDate) -> Result<(Invoice, bool), InvoicingError> {
        let derived = recompute_status(&invoice, today)?;
        if derived.status == invoice.status && derived.paid_at == invoice.paid_at {
            return Ok((invoice, false));
        }

        let mut updated = invoice.clone();
        updated.status = derived.status;
        updated.paid_at = derived.paid_at;
        updated.updated_at = self.clock.now();
        let saved = self
            .store
            .save(&updated, invoice.version, Vec::new())
            .await
            .map_err(InvoicingError::from_write)?;
        debug!(invoice_id = %saved.id, status = %saved.status, "Status refreshed by sweep");
        Ok((saved, true))
    }

    async fn fire(
        &self,
        invoice: &Invoice,
        candidate: &ReminderCandidate,
        report: &mut SweepReport,
    ) -> Result<(), InvoicingError> {
        if self.log.has_sent(candidate.invoice_id, &candidate.rule_key).await? {
            report.already_sent += 1;
            return Ok(());
        }

        let Some(recipient) = self.recipient(invoice).await else {
            warn!(invoice_id = %invoice.id, rule = %candidate.rule_key, "No recipient for reminder");
            report.no_recipient += 1;
            return Ok(());
        };

        let balance = invoice.balance_due()?;
        let notification = Notification {
            channel: NotificationChannel::Email,
            recipient: recipient.clone(),
            template: REMINDER_TEMPLATE.to_string(),
            data: json!({
                "invoice_id": invoice.id,
                "number": invoice.number,
                "rule_key": candidate.rule_key,
                "offset_days": candidate.offset_days,
                "due_date": invoice.due_date,
                "total": invoice.total,
                "balance_due": balance.amount(),
                "currency": invoice.currency,
                "company_name": invoice.company_snapshot.as_ref().map(|c| c.company_name.clone()),
            }),
        };

        if let Err(e) = self.notifier.send(&notification).await {
            warn!(invoice_id = %invoice.id, rule = %candidate.rule_key, error = %e, "Reminder send failed; will retry");
            report.send_failures += 1;
            return Ok(());
        }

        let now = self.clock.now();
        let entry = ReminderLogEntry {
            id: ReminderLogId::new_v7(),
            invoice_id: invoice.id,
            issuer_id: invoice.issuer_id,
            rule_key: candidate.rule_key.clone(),
            offset_days: candidate.offset_days,
            sent_at: now,
        };
        let event = InvoiceEvent::new(
            invoice.issuer_id,
            invoice.id,
            InvoiceEventType::ReminderSent,
            json!({
                "rule_key": candidate.rule_key,
                "offset_days": candidate.offset_days,
                "channel": "email",
                "recipient": recipient,
            }),
            now,
        );

        match self.log.record_sent(&entry, event).await {
            Ok(true) => {
                info!(invoice_id = %invoice.id, rule = %candidate.rule_key, "Reminder sent");
                report.sent += 1;
            }
            Ok(false) => report.already_sent += 1,
            Err(e) => {
                warn!(invoice_id = %invoice.id, rule = %candidate.rule_key, error = %e, "Reminder sent but not logged");
                report.log_failures += 1;
            }
        }
        Ok(())
    }

    /// Frozen counterparty email first, live directory second
    async fn recipient(&self, invoice: &Invoice) -> Option<String> {
        if let Some(email) = invoice
            .counterparty_snapshot
            .as_ref()
            .and_then(|s| s.email.clone())
            .filter(|e| !e.trim().is_empty())
        {
            return Some(email);
        }
        let counterparty = invoice.counterparty?;
        match self.directory.find_counterparty(invoice.issuer_id, counterparty).await {
            Ok(record) => record.and_then(|r| r.email).filter(|e| !e.trim().is_empty()),
            Err(e) => {
                warn!(invoice_id = %invoice.id, error = %e, "Counterparty lookup failed");
                None
            }
        }
    }
}
