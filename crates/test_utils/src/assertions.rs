//! Custom Test Assertions
//!
//! Invariant checks that give more meaningful failure messages than a bare
//! `assert_eq!`.

use rust_decimal::Decimal;

use domain_invoicing::{Invoice, InvoiceEvent, InvoiceEventType};

/// Asserts that stored line values sum exactly to the invoice aggregates
pub fn assert_sum_invariant(invoice: &Invoice) {
    let subtotal: Decimal = invoice.lines.iter().map(|l| l.subtotal).sum();
    let tax: Decimal = invoice.lines.iter().map(|l| l.tax_amount).sum();
    let total: Decimal = invoice.lines.iter().map(|l| l.total).sum();

    assert_eq!(subtotal, invoice.subtotal, "line subtotals drift from invoice subtotal");
    assert_eq!(tax, invoice.tax_amount, "line taxes drift from invoice tax amount");
    assert_eq!(total, invoice.total, "line totals drift from invoice total");
}

/// Asserts that the sequences form exactly `1..=n`
pub fn assert_contiguous_from_one(mut sequences: Vec<i64>) {
    sequences.sort_unstable();
    let expected: Vec<i64> = (1..=sequences.len() as i64).collect();
    assert_eq!(
        sequences, expected,
        "issued sequence numbers must be gapless and unique, starting at 1"
    );
}

/// Number of events of one type
pub fn count_events(events: &[InvoiceEvent], event_type: InvoiceEventType) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}

/// Asserts exactly one event of the given type exists and returns it
pub fn assert_single_event(events: &[InvoiceEvent], event_type: InvoiceEventType) -> &InvoiceEvent {
    let matching: Vec<&InvoiceEvent> = events.iter().filter(|e| e.event_type == event_type).collect();
    assert_eq!(
        matching.len(),
        1,
        "expected exactly one {} event, found {}",
        event_type.as_str(),
        matching.len()
    );
    matching[0]
}
