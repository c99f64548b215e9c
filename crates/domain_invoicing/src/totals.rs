//! Totals calculation
//!
//! Turns line specifications into tax-inclusive computed lines and invoice
//! aggregates. This is the only place monetary values of an invoice are
//! produced: any total supplied by a caller is discarded and recomputed here
//! before persistence.
//!
//! Rounding is half-up to two decimals and is applied at every intermediate
//! step, so stored per-line values always sum exactly to the stored aggregate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{round2, round_half_up, Rate};

/// How the entered amount of a line relates to tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    /// Unit price excludes tax
    #[default]
    Base,
    /// The entered line total includes tax
    Total,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Base => "base",
            PricingMode::Total => "total",
        }
    }
}

impl std::str::FromStr for PricingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(PricingMode::Base),
            "total" => Ok(PricingMode::Total),
            other => Err(format!("Unknown pricing mode: {}", other)),
        }
    }
}

/// A line as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub description: String,
    pub quantity: Decimal,
    /// Unit price excluding tax (used in `base` mode)
    #[serde(default)]
    pub unit_price: Decimal,
    /// Tax-inclusive line amount (required in `total` mode)
    #[serde(default)]
    pub line_total: Option<Decimal>,
    pub tax_percent: Decimal,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    /// Overrides the invoice-level pricing mode
    #[serde(default)]
    pub pricing_mode: Option<PricingMode>,
}

impl LineSpec {
    /// A `base` mode line
    pub fn base(description: impl Into<String>, quantity: Decimal, unit_price: Decimal, tax_percent: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            line_total: None,
            tax_percent,
            discount_percent: None,
            pricing_mode: Some(PricingMode::Base),
        }
    }

    /// A `total` mode line, where `line_total` already includes tax
    pub fn tax_inclusive(description: impl Into<String>, quantity: Decimal, line_total: Decimal, tax_percent: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price: Decimal::ZERO,
            line_total: Some(line_total),
            tax_percent,
            discount_percent: None,
            pricing_mode: Some(PricingMode::Total),
        }
    }

    pub fn with_discount(mut self, discount_percent: Decimal) -> Self {
        self.discount_percent = Some(discount_percent);
        self
    }
}

/// A line after totals calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub tax_percent: Decimal,
    pub pricing_mode: PricingMode,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Invoice-level aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Sums already-rounded line values
    ///
    /// `None` when a sum leaves the storable range.
    pub fn from_lines<I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Decimal, Decimal, Decimal)>,
    {
        let mut totals = Self::default();
        for (subtotal, tax_amount, total) in lines {
            totals.subtotal = totals.subtotal.checked_add(subtotal)?;
            totals.tax_amount = totals.tax_amount.checked_add(tax_amount)?;
            totals.total = totals.total.checked_add(total)?;
        }
        let totals = Self {
            subtotal: round2(totals.subtotal),
            tax_amount: round2(totals.tax_amount),
            total: round2(totals.total),
        };
        totals.is_storable().then_some(totals)
    }

    fn is_storable(&self) -> bool {
        within_amount_range(self.subtotal) && within_amount_range(self.tax_amount) && within_amount_range(self.total)
    }

    pub fn negated(&self) -> Self {
        Self {
            subtotal: -self.subtotal,
            tax_amount: -self.tax_amount,
            total: -self.total,
        }
    }
}

/// Largest magnitude a stored amount may have (`NUMERIC(18, 2)`)
pub const MAX_AMOUNT: Decimal = dec!(9999999999999999.99);

fn within_amount_range(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

/// Options controlling totals calculation
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationOptions {
    /// Invoice-level pricing mode, used when a line does not override it
    pub default_mode: PricingMode,
    /// Credit notes carry negative amounts; regular invoices must not
    pub allow_negative_amounts: bool,
}

/// Result of computing a whole invoice
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedInvoice {
    pub lines: Vec<ComputedLine>,
    pub totals: InvoiceTotals,
}

/// Validates line specifications, returning one message per problem
pub fn validate_lines(specs: &[LineSpec], options: CalculationOptions) -> Vec<String> {
    let mut errors = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        let n = index + 1;
        if spec.quantity < Decimal::ZERO {
            errors.push(format!("Line {}: quantity cannot be negative", n));
        }
        if spec.tax_percent < Decimal::ZERO {
            errors.push(format!("Line {}: tax percent cannot be negative", n));
        }
        if let Some(discount) = spec.discount_percent {
            if discount < Decimal::ZERO || discount > dec!(100) {
                errors.push(format!("Line {}: discount percent must be between 0 and 100", n));
            }
        }
        match spec.pricing_mode.unwrap_or(options.default_mode) {
            PricingMode::Total => match spec.line_total {
                None => errors.push(format!("Line {}: a line total is required when prices include tax", n)),
                Some(total) if total < Decimal::ZERO && !options.allow_negative_amounts => {
                    errors.push(format!("Line {}: line total cannot be negative", n))
                }
                Some(_) => {}
            },
            PricingMode::Base => {
                if spec.unit_price < Decimal::ZERO && !options.allow_negative_amounts {
                    errors.push(format!("Line {}: unit price cannot be negative", n));
                }
            }
        }
    }

    errors
}

/// Computes a single line
///
/// Callers are expected to have run [`validate_lines`]; a `total` mode line
/// without a supplied total is treated as zero. Returns `None` when an
/// intermediate value overflows or a resulting amount is not storable.
pub fn compute_line(spec: &LineSpec, default_mode: PricingMode) -> Option<ComputedLine> {
    let mode = spec.pricing_mode.unwrap_or(default_mode);
    let tax_rate = Rate::from_percentage(spec.tax_percent).as_decimal();
    let discount_factor = spec
        .discount_percent
        .map(|d| Rate::from_percentage(d).complement())
        .unwrap_or(Decimal::ONE);

    let (unit_price, subtotal, tax_amount, total) = match mode {
        PricingMode::Base => {
            let gross = spec.quantity.checked_mul(spec.unit_price)?.checked_mul(discount_factor)?;
            let subtotal = round2(gross);
            let tax_amount = round2(subtotal.checked_mul(tax_rate)?);
            let total = round2(subtotal.checked_add(tax_amount)?);
            (spec.unit_price, subtotal, tax_amount, total)
        }
        PricingMode::Total => {
            let total = round2(spec.line_total.unwrap_or(Decimal::ZERO));
            let subtotal = round2(total.checked_div(Decimal::ONE.checked_add(tax_rate)?)?);
            let tax_amount = round2(total.checked_sub(subtotal)?);
            let denominator = spec.quantity.checked_mul(discount_factor)?;
            let unit_price = if denominator > Decimal::ZERO {
                round_half_up(subtotal.checked_div(denominator)?, 6)
            } else {
                Decimal::ZERO
            };
            (unit_price, subtotal, tax_amount, total)
        }
    };

    if !(within_amount_range(subtotal) && within_amount_range(tax_amount) && within_amount_range(total)) {
        return None;
    }

    Some(ComputedLine {
        description: spec.description.trim().to_string(),
        quantity: spec.quantity,
        unit_price,
        discount_percent: spec.discount_percent,
        tax_percent: spec.tax_percent,
        pricing_mode: mode,
        subtotal,
        tax_amount,
        total,
    })
}

/// Validates and computes all lines plus the invoice aggregates
pub fn compute_invoice(specs: &[LineSpec], options: CalculationOptions) -> Result<ComputedInvoice, Vec<String>> {
    let mut errors = validate_lines(specs, options);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut lines = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        match compute_line(spec, options.default_mode) {
            Some(line) => lines.push(line),
            None => errors.push(format!("Line {}: amount out of range", index + 1)),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let totals = InvoiceTotals::from_lines(lines.iter().map(|l| (l.subtotal, l.tax_amount, l.total)))
        .ok_or_else(|| vec!["Invoice total out of range".to_string()])?;

    Ok(ComputedInvoice { lines, totals })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CalculationOptions {
        CalculationOptions::default()
    }

    #[test]
    fn test_base_mode_line() {
        let line = compute_line(&LineSpec::base("Consulting", dec!(2), dec!(100), dec!(21)), PricingMode::Base).unwrap();
        assert_eq!(line.subtotal, dec!(200.00));
        assert_eq!(line.tax_amount, dec!(42.00));
        assert_eq!(line.total, dec!(242.00));
    }

    #[test]
    fn test_total_mode_line() {
        let line = compute_line(&LineSpec::tax_inclusive("Support", dec!(1), dec!(121), dec!(21)), PricingMode::Base).unwrap();
        assert_eq!(line.subtotal, dec!(100.00));
        assert_eq!(line.tax_amount, dec!(21.00));
        assert_eq!(line.total, dec!(121.00));
        assert_eq!(line.unit_price, dec!(100));
    }

    #[test]
    fn test_total_mode_with_zero_quantity_derives_zero_price() {
        let line = compute_line(&LineSpec::tax_inclusive("Fee", dec!(0), dec!(50), dec!(21)), PricingMode::Base).unwrap();
        assert_eq!(line.unit_price, Decimal::ZERO);
        assert_eq!(line.total, dec!(50.00));
    }

    #[test]
    fn test_discount_applies_before_tax() {
        let spec = LineSpec::base("Licence", dec!(3), dec!(33.33), dec!(10)).with_discount(dec!(15));
        let line = compute_line(&spec, PricingMode::Base).unwrap();
        // 3 * 33.33 * 0.85 = 84.9915
        assert_eq!(line.subtotal, dec!(84.99));
        assert_eq!(line.tax_amount, dec!(8.50));
        assert_eq!(line.total, dec!(93.49));
    }

    #[test]
    fn test_invoice_default_mode_applies_when_line_has_none() {
        let mut spec = LineSpec::tax_inclusive("Item", dec!(1), dec!(110), dec!(10));
        spec.pricing_mode = None;
        let options = CalculationOptions { default_mode: PricingMode::Total, ..Default::default() };
        let computed = compute_invoice(&[spec], options).unwrap();
        assert_eq!(computed.lines[0].pricing_mode, PricingMode::Total);
        assert_eq!(computed.totals.subtotal, dec!(100.00));
    }

    #[test]
    fn test_validation_rejects_negative_quantity_and_missing_total() {
        let specs = vec![
            LineSpec::base("A", dec!(-1), dec!(10), dec!(21)),
            LineSpec {
                line_total: None,
                ..LineSpec::tax_inclusive("B", dec!(1), dec!(0), dec!(21))
            },
        ];
        let errors = compute_invoice(&specs, options()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("quantity"));
        assert!(errors[1].contains("line total"));
    }

    #[test]
    fn test_negative_amounts_only_for_credit_notes() {
        let specs = vec![LineSpec::base("Credit", dec!(1), dec!(-100), dec!(21))];
        assert!(compute_invoice(&specs, options()).is_err());

        let credit = CalculationOptions { allow_negative_amounts: true, ..Default::default() };
        let computed = compute_invoice(&specs, credit).unwrap();
        assert_eq!(computed.totals.total, dec!(-121.00));
    }

    #[test]
    fn test_oversized_quantity_is_reported_not_panicking() {
        let specs = vec![
            LineSpec::base("Consulting", dec!(2), dec!(100), dec!(21)),
            LineSpec::base("Bulk", Decimal::MAX, dec!(2), dec!(21)),
        ];
        let errors = compute_invoice(&specs, options()).unwrap_err();
        assert_eq!(errors, vec!["Line 2: amount out of range".to_string()]);
    }

    #[test]
    fn test_line_above_storable_amount_is_rejected() {
        let spec = LineSpec::base("Fleet", dec!(10), dec!(1000000000000000000), dec!(0));
        assert!(compute_line(&spec, PricingMode::Base).is_none());

        let inclusive = LineSpec::tax_inclusive("Fleet", dec!(1), Decimal::MAX, dec!(21));
        assert!(compute_line(&inclusive, PricingMode::Base).is_none());
    }

    #[test]
    fn test_lines_that_fit_can_still_overflow_the_invoice() {
        let near_limit = LineSpec::base("Half", dec!(1), dec!(6000000000000000), dec!(0));
        let errors = compute_invoice(&[near_limit.clone(), near_limit], options()).unwrap_err();
        assert_eq!(errors, vec!["Invoice total out of range".to_string()]);
    }

    #[test]
    fn test_aggregates_sum_lines() {
        let specs = vec![
            LineSpec::base("A", dec!(1), dec!(0.333), dec!(21)),
            LineSpec::base("B", dec!(1), dec!(0.333), dec!(21)),
            LineSpec::base("C", dec!(1), dec!(0.333), dec!(21)),
        ];
        let computed = compute_invoice(&specs, options()).unwrap();
        assert_eq!(computed.totals.subtotal, dec!(0.99));
        assert_eq!(computed.totals.tax_amount, dec!(0.21));
        assert_eq!(computed.totals.total, dec!(1.20));
    }
}
