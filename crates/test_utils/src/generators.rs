//! Property-Based Test Generators
//!
//! Proptest strategies for line items that respect input validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_invoicing::{LineSpec, PricingMode};

/// Quantities from 0.00 to 999.99
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|q| Decimal::new(q, 2))
}

/// Prices from 0.0000 to 99,999.9999
pub fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|p| Decimal::new(p, 4))
}

/// Common VAT rates plus arbitrary whole percentages
pub fn tax_percent_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::ZERO),
        Just(Decimal::new(4, 0)),
        Just(Decimal::new(10, 0)),
        Just(Decimal::new(21, 0)),
        (0i64..=50).prop_map(|t| Decimal::new(t, 0)),
    ]
}

pub fn discount_strategy() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of((0i64..=10_000).prop_map(|d| Decimal::new(d, 2)))
}

/// A valid line in either pricing mode
pub fn line_spec_strategy() -> impl Strategy<Value = LineSpec> {
    (
        quantity_strategy(),
        price_strategy(),
        tax_percent_strategy(),
        discount_strategy(),
        any::<bool>(),
    )
        .prop_map(|(quantity, amount, tax_percent, discount, tax_inclusive)| {
            let mut line = if tax_inclusive {
                LineSpec::tax_inclusive("Generated line", quantity, amount, tax_percent)
            } else {
                LineSpec::base("Generated line", quantity, amount, tax_percent)
            };
            line.discount_percent = discount;
            line.pricing_mode = Some(if tax_inclusive { PricingMode::Total } else { PricingMode::Base });
            line
        })
}

pub fn line_specs_strategy(max: usize) -> impl Strategy<Value = Vec<LineSpec>> {
    prop::collection::vec(line_spec_strategy(), 1..=max)
}
