//! Formatting
//!
//! Money is rendered through its currency's locale: rupees group digits
//! 3-2-2 (`₹1,23,456.78`), most other currencies in threes.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};

/// Render money for display, e.g. `₹13,216.00`.
pub fn format_money(money: &Money<'_, Currency>) -> String {
    money.to_string()
}

/// Render an amount given in minor units.
pub fn format_minor(minor: i64, currency: &Currency) -> String {
    format_money(&Money::from_minor(minor, currency))
}

/// Render a fractional rate as a percentage, e.g. `0.18` as `18%`.
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}
