//! Receivables summary
//!
//! Outstanding and overdue amounts per currency, classified fresh from the
//! due-state rules on every call. Currencies are never mixed.
//!
//! Only customer invoices with a positive total count. Provider bills are
//! payables, and issued rectifications (negative totals) are credit notes
//! whose effect is not netted against the invoices they correct.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Currency, MoneyError};

use crate::due::{compute_invoice_due_info, DueState};
use crate::invoice::{Invoice, InvoiceStatus, InvoiceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablesSummary {
    pub currency: Currency,
    pub open_count: usize,
    /// Sum of balances still due
    pub outstanding: Decimal,
    pub overdue_amount: Decimal,
    pub overdue_count: usize,
    pub due_today_count: usize,
    pub upcoming_count: usize,
}

impl ReceivablesSummary {
    fn empty(currency: Currency) -> Self {
        Self {
            currency,
            open_count: 0,
            outstanding: Decimal::ZERO,
            overdue_amount: Decimal::ZERO,
            overdue_count: 0,
            due_today_count: 0,
            upcoming_count: 0,
        }
    }
}

/// Summarizes issued, unsettled customer invoices, one entry per currency
pub fn summarize_receivables(invoices: &[Invoice], today: NaiveDate) -> Result<Vec<ReceivablesSummary>, MoneyError> {
    let mut by_currency: BTreeMap<&'static str, ReceivablesSummary> = BTreeMap::new();

    for invoice in invoices {
        if invoice.status == InvoiceStatus::Draft || invoice.status.is_terminal() {
            continue;
        }
        if invoice.invoice_type != InvoiceType::Customer || invoice.total <= Decimal::ZERO {
            continue;
        }
        let balance = invoice.balance_due()?.amount();
        let summary = by_currency
            .entry(invoice.currency.code())
            .or_insert_with(|| ReceivablesSummary::empty(invoice.currency));

        summary.open_count += 1;
        summary.outstanding += balance;
        match compute_invoice_due_info(invoice, today).state {
            DueState::Overdue => {
                summary.overdue_count += 1;
                summary.overdue_amount += balance;
            }
            DueState::DueToday => summary.due_today_count += 1,
            DueState::Upcoming => summary.upcoming_count += 1,
            DueState::NotDue | DueState::Paid => {}
        }
    }

    Ok(by_currency.into_values().collect())
}
