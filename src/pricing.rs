//! Pricing
//!
//! The order pricing calculator: a pure mapping from line items and pricing
//! rules to an [`OrderSummary`]. All arithmetic is done on integer minor
//! units; decimals appear only when a summary is serialized or formatted.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::{
    items::{
        LineItem, ValidationError,
        raw::{RawLineItem, validate_all},
    },
    money::from_minor_units,
    rules::PricingRules,
};

/// Errors that can occur while pricing an order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A line item failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A line item's currency differs from the rules' currency
    /// (index, item currency, rules currency).
    #[error("Item {0} has currency {1}, but pricing rules use {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// Minor unit arithmetic overflowed.
    #[error("order amount overflowed")]
    Overflow,
}

/// Derived totals for a set of line items under a set of pricing rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSummary {
    subtotal: i64,
    tax: i64,
    shipping: i64,
    total: i64,
    item_count: u64,
    line_count: usize,
    free_shipping_threshold: i64,
    currency: &'static Currency,
}

impl OrderSummary {
    /// Summary of an empty order under the given rules.
    pub fn empty(rules: &PricingRules) -> Self {
        Self {
            subtotal: 0,
            tax: 0,
            shipping: 0,
            total: 0,
            item_count: 0,
            line_count: 0,
            free_shipping_threshold: rules.free_shipping_threshold_minor(),
            currency: rules.currency(),
        }
    }

    /// Sum of unit price times quantity over all lines.
    pub fn subtotal(&self) -> Money<'static, Currency> {
        self.money(self.subtotal)
    }

    /// Tax on the subtotal.
    pub fn tax(&self) -> Money<'static, Currency> {
        self.money(self.tax)
    }

    /// Shipping charge.
    pub fn shipping(&self) -> Money<'static, Currency> {
        self.money(self.shipping)
    }

    /// Subtotal plus tax plus shipping.
    pub fn total(&self) -> Money<'static, Currency> {
        self.money(self.total)
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Currency of every amount in the summary.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Whether the order has no lines.
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Whether the order ships free. An empty order always does.
    pub fn has_free_shipping(&self) -> bool {
        self.is_empty() || self.subtotal >= self.free_shipping_threshold
    }

    /// How much more subtotal is needed to reach free shipping, or zero.
    pub fn remaining_for_free_shipping(&self) -> Money<'static, Currency> {
        if self.has_free_shipping() {
            return self.money(0);
        }

        self.money(self.free_shipping_threshold.saturating_sub(self.subtotal))
    }

    fn money(&self, minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, self.currency)
    }
}

/// Wire shape of a summary: decimal strings in major units.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryView<'a> {
    currency: &'a str,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    item_count: u64,
    line_count: usize,
}

impl Serialize for OrderSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SummaryView {
            currency: self.currency.iso_alpha_code,
            subtotal: from_minor_units(self.subtotal, self.currency),
            tax: from_minor_units(self.tax, self.currency),
            shipping: from_minor_units(self.shipping, self.currency),
            total: from_minor_units(self.total, self.currency),
            item_count: self.item_count,
            line_count: self.line_count,
        }
        .serialize(serializer)
    }
}

/// Computes the order summary for a list of line items.
///
/// An empty list prices to zero throughout, shipping included. A non-empty
/// list whose subtotal is zero pays the flat fee unless the threshold is zero.
///
/// # Errors
///
/// - [`PricingError::CurrencyMismatch`]: a line is priced in another currency than the rules.
/// - [`PricingError::Overflow`]: an amount does not fit in `i64` minor units.
pub fn calculate(
    items: &[LineItem<'_>],
    rules: &PricingRules,
) -> Result<OrderSummary, PricingError> {
    ensure_currency(items, rules.currency())?;

    let subtotal = subtotal_minor(items)?;
    let tax = tax_minor(subtotal, rules.tax_rate())?;

    let shipping = if items.is_empty() {
        0
    } else {
        shipping_minor(subtotal, rules)
    };

    let total = subtotal
        .checked_add(tax)
        .and_then(|sum| sum.checked_add(shipping))
        .ok_or(PricingError::Overflow)?;

    let item_count = items
        .iter()
        .map(|item| u64::from(item.quantity()))
        .sum();

    Ok(OrderSummary {
        subtotal,
        tax,
        shipping,
        total,
        item_count,
        line_count: items.len(),
        free_shipping_threshold: rules.free_shipping_threshold_minor(),
        currency: rules.currency(),
    })
}

/// Validates raw line input, then computes the order summary.
///
/// No summary is produced if any line is invalid.
///
/// # Errors
///
/// - [`PricingError::Validation`]: the first invalid line, with its position.
/// - Anything [`calculate`] returns.
pub fn calculate_raw(
    raw: &[RawLineItem],
    rules: &PricingRules,
) -> Result<OrderSummary, PricingError> {
    let items = validate_all(raw, rules.currency())?;

    calculate(&items, rules)
}

/// Calculates the subtotal of a list of line items, in minor units.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if a line total or the sum overflows.
pub fn subtotal_minor(items: &[LineItem<'_>]) -> Result<i64, PricingError> {
    items.iter().try_fold(0_i64, |acc, item| {
        item.line_total_minor()
            .and_then(|line| acc.checked_add(line))
            .ok_or(PricingError::Overflow)
    })
}

/// Tax on a subtotal, rounded to the nearest minor unit, half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the result cannot be represented.
pub fn tax_minor(subtotal: i64, rate: Decimal) -> Result<i64, PricingError> {
    let applied = rate
        .checked_mul(Decimal::from(subtotal))
        .ok_or(PricingError::Overflow)?;

    applied
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)
}

/// Shipping charge for a subtotal: free at or above the threshold.
pub fn shipping_minor(subtotal: i64, rules: &PricingRules) -> i64 {
    if subtotal >= rules.free_shipping_threshold_minor() {
        0
    } else {
        rules.flat_shipping_fee_minor()
    }
}

fn ensure_currency(
    items: &[LineItem<'_>],
    currency: &'static Currency,
) -> Result<(), PricingError> {
    items.iter().enumerate().try_for_each(|(i, item)| {
        let item_currency = item.unit_price().currency();

        if item_currency == currency {
            Ok(())
        } else {
            Err(PricingError::CurrencyMismatch(
                i,
                item_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ))
        }
    })
}
