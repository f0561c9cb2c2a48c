//! Pricing rules
//!
//! Business constants applied when pricing an order: tax rate, free shipping
//! threshold and flat shipping fee. Rules are passed explicitly wherever they
//! are needed; there is no process-wide instance.

use std::{fs, path::Path};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{Currency, INR},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::money::{find_currency, from_minor_units, to_minor_units};

/// Default tax rate (18% GST).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Default free shipping threshold, in paise (₹10,000).
pub const DEFAULT_FREE_SHIPPING_THRESHOLD_MINOR: i64 = 1_000_000;

/// Default flat shipping fee, in paise (₹500).
pub const DEFAULT_FLAT_SHIPPING_FEE_MINOR: i64 = 50_000;

/// Errors building or loading pricing rules.
#[derive(Debug, Error)]
pub enum RulesError {
    /// IO error reading a rules file
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Tax rate outside `[0, 1)`
    #[error("Tax rate must be at least 0 and below 1, got {0}")]
    InvalidTaxRate(Decimal),

    /// Unparseable tax rate
    #[error("Invalid tax rate format: {0}")]
    InvalidTaxRateFormat(String),

    /// A threshold or fee below zero (field name, value)
    #[error("{0} must not be negative, got {1}")]
    NegativeAmount(&'static str, Decimal),

    /// A threshold or fee that cannot be held in minor units (field name, value)
    #[error("{0} is not a valid amount: {1}")]
    InvalidAmount(&'static str, Decimal),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Pricing rules for computing an order summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRules {
    currency: &'static Currency,
    tax_rate: Decimal,
    free_shipping_threshold: i64,
    flat_shipping_fee: i64,
}

impl PricingRules {
    /// Create rules from a tax rate fraction and amounts in minor units.
    ///
    /// # Errors
    ///
    /// - [`RulesError::InvalidTaxRate`]: the rate is outside `[0, 1)`.
    /// - [`RulesError::NegativeAmount`]: the threshold or fee is negative.
    pub fn new(
        currency: &'static Currency,
        tax_rate: Decimal,
        free_shipping_threshold_minor: i64,
        flat_shipping_fee_minor: i64,
    ) -> Result<Self, RulesError> {
        validate_tax_rate(tax_rate)?;

        non_negative_minor(
            "free_shipping_threshold",
            free_shipping_threshold_minor,
            currency,
        )?;
        non_negative_minor("flat_shipping_fee", flat_shipping_fee_minor, currency)?;

        Ok(Self {
            currency,
            tax_rate,
            free_shipping_threshold: free_shipping_threshold_minor,
            flat_shipping_fee: flat_shipping_fee_minor,
        })
    }

    /// Replace the tax rate.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidTaxRate`] if the rate is outside `[0, 1)`.
    pub fn with_tax_rate(self, tax_rate: Decimal) -> Result<Self, RulesError> {
        validate_tax_rate(tax_rate)?;

        Ok(Self { tax_rate, ..self })
    }

    /// Replace the free shipping threshold (major units).
    ///
    /// # Errors
    ///
    /// Returns a [`RulesError`] if the amount is negative or finer than a minor unit.
    pub fn with_free_shipping_threshold(self, amount: Decimal) -> Result<Self, RulesError> {
        let minor = amount_to_minor("free_shipping_threshold", amount, self.currency)?;

        Ok(Self {
            free_shipping_threshold: minor,
            ..self
        })
    }

    /// Replace the flat shipping fee (major units).
    ///
    /// # Errors
    ///
    /// Returns a [`RulesError`] if the amount is negative or finer than a minor unit.
    pub fn with_flat_shipping_fee(self, amount: Decimal) -> Result<Self, RulesError> {
        let minor = amount_to_minor("flat_shipping_fee", amount, self.currency)?;

        Ok(Self {
            flat_shipping_fee: minor,
            ..self
        })
    }

    /// Parse rules from YAML. Missing keys fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`RulesError`] if the YAML is malformed or a value is invalid.
    pub fn from_yaml_str(contents: &str) -> Result<Self, RulesError> {
        let file: RulesFile = serde_norway::from_str(contents)?;

        file.try_into()
    }

    /// Load rules from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`RulesError`] if the file cannot be read or parsed, or a value is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let rules = Self::from_yaml_str(&contents)?;

        debug!(
            path = %path.display(),
            currency = rules.currency.iso_alpha_code,
            tax_rate = %rules.tax_rate,
            free_shipping_threshold = rules.free_shipping_threshold,
            flat_shipping_fee = rules.flat_shipping_fee,
            "loaded pricing rules"
        );

        Ok(rules)
    }

    /// Currency every line item must be priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Tax rate as a fraction.
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Tax rate as a percentage.
    pub fn tax_percentage(&self) -> Percentage {
        Percentage::from(self.tax_rate)
    }

    /// Subtotal at or above which shipping is free.
    pub fn free_shipping_threshold(&self) -> Money<'static, Currency> {
        Money::from_minor(self.free_shipping_threshold, self.currency)
    }

    /// Shipping charged below the threshold.
    pub fn flat_shipping_fee(&self) -> Money<'static, Currency> {
        Money::from_minor(self.flat_shipping_fee, self.currency)
    }

    pub(crate) fn free_shipping_threshold_minor(&self) -> i64 {
        self.free_shipping_threshold
    }

    pub(crate) fn flat_shipping_fee_minor(&self) -> i64 {
        self.flat_shipping_fee
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            currency: INR,
            tax_rate: DEFAULT_TAX_RATE,
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD_MINOR,
            flat_shipping_fee: DEFAULT_FLAT_SHIPPING_FEE_MINOR,
        }
    }
}

/// Rules as written in YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    /// ISO currency code (e.g. "INR")
    currency: Option<String>,

    /// "18%" or 0.18
    tax_rate: Option<TaxRate>,

    /// Major units
    free_shipping_threshold: Option<Decimal>,

    /// Major units
    flat_shipping_fee: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaxRate {
    Fraction(Decimal),
    Text(String),
}

impl TryFrom<RulesFile> for PricingRules {
    type Error = RulesError;

    fn try_from(file: RulesFile) -> Result<Self, Self::Error> {
        let defaults = PricingRules::default();

        let currency = match file.currency {
            Some(code) => find_currency(&code).ok_or(RulesError::UnknownCurrency(code))?,
            None => defaults.currency,
        };

        let mut rules = PricingRules { currency, ..defaults };

        if let Some(rate) = file.tax_rate {
            rules = rules.with_tax_rate(parse_tax_rate(rate)?)?;
        }

        if let Some(amount) = file.free_shipping_threshold {
            rules = rules.with_free_shipping_threshold(amount)?;
        }

        if let Some(amount) = file.flat_shipping_fee {
            rules = rules.with_flat_shipping_fee(amount)?;
        }

        Ok(rules)
    }
}

/// Parse "18%" or "0.18" into a fraction.
fn parse_tax_rate(rate: TaxRate) -> Result<Decimal, RulesError> {
    let text = match rate {
        TaxRate::Fraction(fraction) => return Ok(fraction),
        TaxRate::Text(text) => text,
    };

    let trimmed = text.trim();

    if let Some(percent) = trimmed.strip_suffix('%') {
        let value = percent
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| RulesError::InvalidTaxRateFormat(text.clone()))?;

        Ok(value / Decimal::ONE_HUNDRED)
    } else {
        trimmed
            .parse::<Decimal>()
            .map_err(|_err| RulesError::InvalidTaxRateFormat(text.clone()))
    }
}

fn validate_tax_rate(rate: Decimal) -> Result<(), RulesError> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(RulesError::InvalidTaxRate(rate));
    }

    Ok(())
}

fn non_negative_minor(
    field: &'static str,
    minor: i64,
    currency: &Currency,
) -> Result<(), RulesError> {
    if minor < 0 {
        return Err(RulesError::NegativeAmount(
            field,
            from_minor_units(minor, currency),
        ));
    }

    Ok(())
}

fn amount_to_minor(
    field: &'static str,
    amount: Decimal,
    currency: &Currency,
) -> Result<i64, RulesError> {
    if amount < Decimal::ZERO {
        return Err(RulesError::NegativeAmount(field, amount));
    }

    to_minor_units(amount, currency).map_err(|_err| RulesError::InvalidAmount(field, amount))
}
