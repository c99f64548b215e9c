//! Due-state classification
//!
//! The due state is a temporal view of an invoice, recomputed on every read
//! from its status, its due date and the current calendar day. It is never
//! persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::calendar_days_between;

use crate::invoice::{Invoice, InvoiceStatus};

/// Days before the due date during which an invoice counts as upcoming
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueState {
    NotDue,
    Upcoming,
    DueToday,
    Overdue,
    Paid,
}

impl DueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueState::NotDue => "not_due",
            DueState::Upcoming => "upcoming",
            DueState::DueToday => "due_today",
            DueState::Overdue => "overdue",
            DueState::Paid => "paid",
        }
    }
}

impl std::str::FromStr for DueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_due" => Ok(DueState::NotDue),
            "upcoming" => Ok(DueState::Upcoming),
            "due_today" => Ok(DueState::DueToday),
            "overdue" => Ok(DueState::Overdue),
            "paid" => Ok(DueState::Paid),
            other => Err(format!("Unknown due state: {}", other)),
        }
    }
}

/// Due state plus its day counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueInfo {
    pub state: DueState,
    /// Days until the due date, when not yet overdue
    pub days_remaining: Option<i64>,
    /// Days past the due date, when overdue
    pub days_overdue: Option<i64>,
    pub is_overdue: bool,
    pub is_due_today: bool,
    /// `due_date - today` in calendar days; `None` once settled
    pub diff_days: Option<i64>,
}

impl DueInfo {
    fn settled() -> Self {
        Self {
            state: DueState::Paid,
            days_remaining: None,
            days_overdue: None,
            is_overdue: false,
            is_due_today: false,
            diff_days: None,
        }
    }
}

/// Classifies an invoice by its distance to the due date
///
/// `PAID` and `CANCELED` map to [`DueState::Paid`] with no counters.
pub fn compute_due_info(status: InvoiceStatus, due_date: NaiveDate, today: NaiveDate) -> DueInfo {
    if status.is_terminal() {
        return DueInfo::settled();
    }

    let diff = calendar_days_between(today, due_date);
    let state = match diff {
        d if d > UPCOMING_WINDOW_DAYS => DueState::NotDue,
        d if d >= 1 => DueState::Upcoming,
        0 => DueState::DueToday,
        _ => DueState::Overdue,
    };

    DueInfo {
        state,
        days_remaining: (diff >= 0).then_some(diff),
        days_overdue: (diff < 0).then(|| diff.abs()),
        is_overdue: diff < 0,
        is_due_today: diff == 0,
        diff_days: Some(diff),
    }
}

pub fn compute_invoice_due_info(invoice: &Invoice, today: NaiveDate) -> DueInfo {
    compute_due_info(invoice.status, invoice.due_date, today)
}
