//! Money helpers
//!
//! Conversions between exact decimal amounts and integer minor units.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Findable, iso::Currency};
use thiserror::Error;

/// Errors converting a decimal amount into minor units.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MinorUnitError {
    /// The amount has more fractional digits than the currency allows.
    #[error("amount is finer than the currency's minor unit")]
    SubMinor,

    /// The amount does not fit in 64-bit minor units.
    #[error("amount is out of range")]
    OutOfRange,
}

/// Number of minor units in one major unit of the currency (100 for INR).
pub fn minor_scale(currency: &Currency) -> Option<i64> {
    10_i64.checked_pow(currency.exponent)
}

/// Convert an exact decimal amount into minor units, without rounding.
///
/// # Errors
///
/// - [`MinorUnitError::SubMinor`]: the amount cannot be represented in whole minor units.
/// - [`MinorUnitError::OutOfRange`]: the amount overflows `i64` minor units.
pub fn to_minor_units(amount: Decimal, currency: &Currency) -> Result<i64, MinorUnitError> {
    let scale = minor_scale(currency).ok_or(MinorUnitError::OutOfRange)?;

    let minor = amount
        .checked_mul(Decimal::from(scale))
        .ok_or(MinorUnitError::OutOfRange)?;

    if !minor.fract().is_zero() {
        return Err(MinorUnitError::SubMinor);
    }

    minor.to_i64().ok_or(MinorUnitError::OutOfRange)
}

/// Convert minor units back into a decimal amount in major units.
pub fn from_minor_units(minor: i64, currency: &Currency) -> Decimal {
    Decimal::new(minor, currency.exponent)
}

/// Look up an ISO currency by its alpha code, case-insensitively.
pub fn find_currency(code: &str) -> Option<&'static Currency> {
    Currency::find(&code.trim().to_ascii_uppercase())
}
