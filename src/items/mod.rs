//! Items
//!
//! A [`LineItem`] is one product entry in a cart or quote. Every `LineItem`
//! that exists has been validated: its quantity is at least one and its
//! unit price is a non-negative whole number of minor units.

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    money::{MinorUnitError, to_minor_units},
    products::ProductId,
};

pub mod raw;

/// Why a line item was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineItemFault {
    /// Unit price is below zero.
    #[error("unit price is negative")]
    NegativePrice,

    /// Quantity is zero or below.
    #[error("quantity must be at least 1")]
    NonPositiveQuantity,

    /// Quantity has a fractional part.
    #[error("quantity must be a whole number")]
    NonIntegerQuantity,

    /// Price or quantity was NaN or infinite.
    #[error("numeric input is not finite")]
    NonFinite,

    /// Unit price is finer than the currency's minor unit.
    #[error("unit price is finer than the currency's minor unit")]
    SubMinorPrice,

    /// Unit price does not fit in minor units.
    #[error("unit price is out of range")]
    PriceOutOfRange,

    /// Quantity does not fit in a `u32`.
    #[error("quantity is too large")]
    QuantityTooLarge,

    /// Product identifier is empty.
    #[error("product identifier is empty")]
    EmptyProductId,
}

impl From<MinorUnitError> for LineItemFault {
    fn from(err: MinorUnitError) -> Self {
        match err {
            MinorUnitError::SubMinor => LineItemFault::SubMinorPrice,
            MinorUnitError::OutOfRange => LineItemFault::PriceOutOfRange,
        }
    }
}

/// Line item validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A line item failed validation (position in the input, if known).
    #[error("invalid line item {}: {reason}", describe(.index.as_ref().copied(), .product_id))]
    InvalidLineItem {
        /// Position of the line in its input list, when validated as part of one.
        index: Option<usize>,

        /// Product the line refers to.
        product_id: ProductId,

        /// What was wrong with it.
        reason: LineItemFault,
    },
}

impl ValidationError {
    /// Build an `InvalidLineItem` error for a single, unpositioned line.
    pub fn invalid(product_id: ProductId, reason: LineItemFault) -> Self {
        ValidationError::InvalidLineItem {
            index: None,
            product_id,
            reason,
        }
    }

    /// Attach the line's position within its input list.
    #[must_use]
    pub fn at(self, position: usize) -> Self {
        match self {
            ValidationError::InvalidLineItem {
                product_id, reason, ..
            } => ValidationError::InvalidLineItem {
                index: Some(position),
                product_id,
                reason,
            },
        }
    }

    /// The fault behind this error.
    pub fn reason(&self) -> LineItemFault {
        match self {
            ValidationError::InvalidLineItem { reason, .. } => *reason,
        }
    }
}

fn describe(index: Option<usize>, product_id: &ProductId) -> String {
    match index {
        Some(index) => format!("#{index} ({product_id})"),
        None => format!("({product_id})"),
    }
}

/// A validated cart line: product, unit price and quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem<'a> {
    product_id: ProductId,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> LineItem<'a> {
    /// Creates a new line item.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] if the product id is blank,
    /// the price is negative or the quantity is zero.
    pub fn new(
        product_id: impl Into<ProductId>,
        unit_price: Money<'a, Currency>,
        quantity: u32,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();

        if let Err(reason) = check(&product_id, unit_price.to_minor_units(), quantity) {
            return Err(ValidationError::invalid(product_id, reason));
        }

        Ok(Self {
            product_id,
            unit_price,
            quantity,
        })
    }

    /// Creates a line item from an exact decimal price (in major units) and a
    /// decimal quantity, as received from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] for negative or sub-minor prices
    /// and for zero, negative, fractional or oversized quantities.
    pub fn from_decimal(
        product_id: impl Into<ProductId>,
        unit_price: Decimal,
        quantity: Decimal,
        currency: &'a Currency,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();

        match parse_decimal_parts(unit_price, quantity, currency) {
            Ok((minor, quantity)) => {
                Self::new(product_id, Money::from_minor(minor, currency), quantity)
            }
            Err(reason) => Err(ValidationError::invalid(product_id, reason)),
        }
    }

    /// Creates a line item from floating point inputs.
    ///
    /// The float is read back as the shortest decimal that round-trips, so
    /// `9999.99` becomes exactly 999999 paise.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] for non-finite input, for values
    /// outside the decimal range and for anything [`LineItem::from_decimal`] rejects.
    pub fn from_f64(
        product_id: impl Into<ProductId>,
        unit_price: f64,
        quantity: f64,
        currency: &'a Currency,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();

        if !unit_price.is_finite() || !quantity.is_finite() {
            return Err(ValidationError::invalid(product_id, LineItemFault::NonFinite));
        }

        let Some(price) = Decimal::from_f64(unit_price) else {
            return Err(ValidationError::invalid(product_id, LineItemFault::PriceOutOfRange));
        };

        let Some(qty) = Decimal::from_f64(quantity) else {
            return Err(ValidationError::invalid(product_id, LineItemFault::QuantityTooLarge));
        };

        Self::from_decimal(product_id, price, qty, currency)
    }

    /// Returns the product of the line.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the unit price of the line.
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Returns the quantity of the line.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price multiplied by quantity, in minor units.
    ///
    /// `None` if the product overflows `i64`.
    pub fn line_total_minor(&self) -> Option<i64> {
        self.unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
    }

    /// Unit price multiplied by quantity.
    pub fn line_total(&self) -> Option<Money<'a, Currency>> {
        self.line_total_minor()
            .map(|minor| Money::from_minor(minor, self.unit_price.currency()))
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) -> Result<(), ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::invalid(
                self.product_id.clone(),
                LineItemFault::NonPositiveQuantity,
            ));
        }

        self.quantity = quantity;

        Ok(())
    }
}

fn check(product_id: &ProductId, price_minor: i64, quantity: u32) -> Result<(), LineItemFault> {
    if product_id.is_blank() {
        return Err(LineItemFault::EmptyProductId);
    }

    if price_minor < 0 {
        return Err(LineItemFault::NegativePrice);
    }

    if quantity == 0 {
        return Err(LineItemFault::NonPositiveQuantity);
    }

    Ok(())
}

fn parse_decimal_parts(
    unit_price: Decimal,
    quantity: Decimal,
    currency: &Currency,
) -> Result<(i64, u32), LineItemFault> {
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(LineItemFault::NegativePrice);
    }

    if !quantity.fract().is_zero() {
        return Err(LineItemFault::NonIntegerQuantity);
    }

    if quantity <= Decimal::ZERO {
        return Err(LineItemFault::NonPositiveQuantity);
    }

    let quantity = quantity.to_u32().ok_or(LineItemFault::QuantityTooLarge)?;
    let minor = to_minor_units(unit_price, currency)?;

    Ok((minor, quantity))
}


#[cfg(test)]
mod tests {
    use rusty_money::iso::{INR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn new_line_item_exposes_parts() -> TestResult {
        let item = LineItem::new("pump", Money::from_minor(500_000, INR), 2)?;

        assert_eq!(item.product_id().as_str(), "pump");
        assert_eq!(item.unit_price(), &Money::from_minor(500_000, INR));
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.line_total(), Some(Money::from_minor(1_000_000, INR)));

        Ok(())
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = LineItem::new("pump", Money::from_minor(100, INR), 0).err();

        assert_eq!(
            err.map(|e| e.reason()),
            Some(LineItemFault::NonPositiveQuantity)
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = LineItem::new("pump", Money::from_minor(-100, INR), 1).err();

        assert_eq!(err.map(|e| e.reason()), Some(LineItemFault::NegativePrice));
    }

    #[test]
    fn zero_price_is_allowed() -> TestResult {
        let item = LineItem::new("sample", Money::from_minor(0, INR), 3)?;

        assert_eq!(item.line_total_minor(), Some(0));

        Ok(())
    }

    #[test]
    fn blank_product_id_is_rejected() {
        let err = LineItem::new("  ", Money::from_minor(100, INR), 1).err();

        assert_eq!(err.map(|e| e.reason()), Some(LineItemFault::EmptyProductId));
    }

    #[test]
    fn from_decimal_converts_to_paise() -> TestResult {
        let item = LineItem::from_decimal("valve", Decimal::new(999_999, 2), Decimal::ONE, INR)?;

        assert_eq!(item.unit_price().to_minor_units(), 999_999);

        Ok(())
    }

    #[test]
    fn from_decimal_rejects_fractional_quantity() {
        let err =
            LineItem::from_decimal("valve", Decimal::ONE, Decimal::new(15, 1), INR).err();

        assert_eq!(
            err.map(|e| e.reason()),
            Some(LineItemFault::NonIntegerQuantity)
        );
    }

    #[test]
    fn from_decimal_rejects_negative_quantity() {
        let err = LineItem::from_decimal("valve", Decimal::ONE, Decimal::NEGATIVE_ONE, INR).err();

        assert_eq!(
            err.map(|e| e.reason()),
            Some(LineItemFault::NonPositiveQuantity)
        );
    }

    #[test]
    fn from_decimal_rejects_oversized_quantity() {
        let err = LineItem::from_decimal(
            "valve",
            Decimal::ONE,
            Decimal::from(u64::from(u32::MAX) + 1),
            INR,
        )
        .err();

        assert_eq!(err.map(|e| e.reason()), Some(LineItemFault::QuantityTooLarge));
    }

    #[test]
    fn from_decimal_rejects_sub_paisa_price() {
        let err = LineItem::from_decimal("valve", Decimal::new(1, 3), Decimal::ONE, INR).err();

        assert_eq!(err.map(|e| e.reason()), Some(LineItemFault::SubMinorPrice));
    }

    #[test]
    fn from_f64_reads_shortest_decimal() -> TestResult {
        let item = LineItem::from_f64("valve", 9999.99, 1.0, INR)?;

        assert_eq!(item.unit_price().to_minor_units(), 999_999);

        Ok(())
    }

    #[test]
    fn from_f64_rejects_non_finite() {
        for (price, qty) in [(f64::NAN, 1.0), (f64::INFINITY, 1.0), (1.0, f64::NAN)] {
            let err = LineItem::from_f64("valve", price, qty, INR).err();

            assert_eq!(
                err.map(|e| e.reason()),
                Some(LineItemFault::NonFinite),
                "expected NonFinite for price={price} qty={qty}"
            );
        }
    }

    #[test]
    fn from_f64_rejects_values_beyond_decimal_range() {
        let price = LineItem::from_f64("valve", 1e30, 1.0, INR).err();
        let quantity = LineItem::from_f64("valve", 1.0, 1e30, INR).err();

        assert_eq!(price.map(|e| e.reason()), Some(LineItemFault::PriceOutOfRange));
        assert_eq!(
            quantity.map(|e| e.reason()),
            Some(LineItemFault::QuantityTooLarge)
        );
    }

    #[test]
    fn from_f64_rejects_negative_price() {
        let err = LineItem::from_f64("valve", -1.0, 1.0, USD).err();

        assert_eq!(err.map(|e| e.reason()), Some(LineItemFault::NegativePrice));
    }

    #[test]
    fn line_total_overflow_is_none() -> TestResult {
        let item = LineItem::new("bulk", Money::from_minor(i64::MAX, INR), 2)?;

        assert_eq!(item.line_total_minor(), None);

        Ok(())
    }

    #[test]
    fn validation_error_message_includes_position() {
        let err = ValidationError::invalid(ProductId::new("pump"), LineItemFault::NegativePrice)
            .at(3);

        assert_eq!(
            err.to_string(),
            "invalid line item #3 (pump): unit price is negative"
        );
    }

    #[test]
    fn set_quantity_rejects_zero() -> TestResult {
        let mut item = LineItem::new("pump", Money::from_minor(100, INR), 1)?;

        assert!(item.set_quantity(0).is_err());
        assert_eq!(item.quantity(), 1);

        item.set_quantity(4)?;
        assert_eq!(item.quantity(), 4);

        Ok(())
    }
}
