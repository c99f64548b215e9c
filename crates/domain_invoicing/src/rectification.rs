//! Rectifications (credit notes)
//!
//! A rectification is a new draft that references an issued original. A
//! `TOTAL` rectification negates every line of the original; a `PARTIAL` one
//! starts from a single zero-valued line to be completed by hand. The
//! original itself is never modified, only linked through events.

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::InvoicingError;
use crate::invoice::{Invoice, InvoiceStatus, RectificationLink, RectificationType};
use crate::totals::{LineSpec, PricingMode};

/// Rejects originals that cannot be rectified
pub fn check_rectifiable(original: &Invoice, reason: &str) -> Result<(), InvoicingError> {
    if reason.trim().is_empty() {
        return Err(InvoicingError::validation("A rectification reason is required"));
    }
    if original.is_rectification() {
        return Err(InvoicingError::validation("A rectification cannot itself be rectified"));
    }
    if !original.is_issued() || matches!(original.status, InvoiceStatus::Draft | InvoiceStatus::Canceled) {
        return Err(InvoicingError::invalid_state(original.id, original.status, "rectify"));
    }
    Ok(())
}

/// Line entries for the new rectification draft
pub fn rectification_lines(original: &Invoice, kind: RectificationType) -> Vec<LineSpec> {
    match kind {
        RectificationType::Total => original
            .lines
            .iter()
            .map(|line| {
                let mut spec = line.to_spec();
                spec.unit_price = -spec.unit_price;
                spec.line_total = spec.line_total.map(|t| -t);
                spec
            })
            .collect(),
        RectificationType::Partial => {
            let tax_percent = original.lines.first().map(|l| l.tax_percent).unwrap_or(Decimal::ZERO);
            let mut placeholder = LineSpec::base(
                format!("Rectification of invoice {}", original.number),
                Decimal::ONE,
                Decimal::ZERO,
                tax_percent,
            );
            placeholder.pricing_mode = Some(PricingMode::Base);
            vec![placeholder]
        }
    }
}

pub fn rectification_link(original: &Invoice, reason: &str, kind: RectificationType) -> RectificationLink {
    RectificationLink {
        rectifies_invoice_id: original.id,
        rectifies_number: original.number.clone(),
        reason: reason.trim().to_string(),
        kind,
    }
}

/// Metadata of the `RECTIFIES` event on the new draft
pub(crate) fn rectifies_metadata(link: &RectificationLink) -> Value {
    json!({
        "rectifies_invoice_id": link.rectifies_invoice_id,
        "rectifies_number": link.rectifies_number,
        "reason": link.reason,
        "kind": link.kind.as_str(),
    })
}

/// Metadata of the `RECTIFICATION_ISSUED` event on the original
pub(crate) fn rectification_issued_metadata(rectification: &Invoice, link: &RectificationLink) -> Value {
    json!({
        "rectification_id": rectification.id,
        "rectification_number": rectification.number,
        "reason": link.reason,
        "kind": link.kind.as_str(),
        "total": rectification.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::{compute_invoice, CalculationOptions};
    use rust_decimal_macros::dec;

    #[test]
    fn test_negated_lines_reproduce_negated_totals() {
        let specs = vec![
            LineSpec::base("Consulting", dec!(3), dec!(33.335), dec!(21)).with_discount(dec!(10)),
            LineSpec::tax_inclusive("Licence", dec!(1), dec!(121), dec!(21)),
        ];
        let original = compute_invoice(&specs, CalculationOptions::default()).unwrap();

        let negated: Vec<LineSpec> = original
            .lines
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let line = crate::invoice::InvoiceLine::from_computed(i as u32 + 1, l.clone());
                let mut spec = line.to_spec();
                spec.unit_price = -spec.unit_price;
                spec.line_total = spec.line_total.map(|t| -t);
                spec
            })
            .collect();
        let options = CalculationOptions { allow_negative_amounts: true, ..Default::default() };
        let credit = compute_invoice(&negated, options).unwrap();

        assert_eq!(credit.totals, original.totals.negated());
        for (c, o) in credit.lines.iter().zip(&original.lines) {
            assert_eq!(c.quantity, o.quantity);
            assert_eq!(c.total, -o.total);
        }
    }
}
