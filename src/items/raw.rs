//! Raw line items
//!
//! Unvalidated line input as the UI layer holds it: JSON numbers that may be
//! negative, fractional or non-finite.

use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};

use crate::{
    items::{LineItem, ValidationError},
    products::ProductId,
};

/// An unvalidated cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    /// Product identifier
    pub product_id: ProductId,

    /// Unit price in major units (rupees)
    pub unit_price: f64,

    /// Requested quantity
    pub quantity: f64,
}

impl RawLineItem {
    /// Create a raw line.
    pub fn new(product_id: impl Into<ProductId>, unit_price: f64, quantity: f64) -> Self {
        Self {
            product_id: product_id.into(),
            unit_price,
            quantity,
        }
    }

    /// Validate this line.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] if the line is invalid.
    pub fn validate<'a>(&self, currency: &'a Currency) -> Result<LineItem<'a>, ValidationError> {
        LineItem::from_f64(
            self.product_id.clone(),
            self.unit_price,
            self.quantity,
            currency,
        )
    }
}

/// Validate every raw line, stopping at the first invalid one.
///
/// # Errors
///
/// Returns the first [`ValidationError::InvalidLineItem`], tagged with its position.
pub fn validate_all<'a>(
    raw: &[RawLineItem],
    currency: &'a Currency,
) -> Result<Vec<LineItem<'a>>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(idx, line)| line.validate(currency).map_err(|err| err.at(idx)))
        .collect()
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::INR;
    use testresult::TestResult;

    use crate::items::LineItemFault;

    use super::*;

    #[test]
    fn validate_all_accepts_valid_lines() -> TestResult {
        let raw = [
            RawLineItem::new("pump", 5000.0, 2.0),
            RawLineItem::new("valve", 1200.0, 1.0),
        ];

        let items = validate_all(&raw, INR)?;

        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().map(LineItem::quantity).sum::<u32>(), 3);

        Ok(())
    }

    #[test]
    fn validate_all_reports_first_bad_line() {
        let raw = [
            RawLineItem::new("pump", 5000.0, 2.0),
            RawLineItem::new("valve", 1200.0, 0.5),
            RawLineItem::new("hose", -1.0, 1.0),
        ];

        let err = validate_all(&raw, INR).err();

        assert_eq!(
            err,
            Some(ValidationError::InvalidLineItem {
                index: Some(1),
                product_id: ProductId::new("valve"),
                reason: LineItemFault::NonIntegerQuantity,
            })
        );
    }

    #[test]
    fn raw_line_deserializes_from_camel_case() -> TestResult {
        let line: RawLineItem =
            serde_json::from_str(r#"{"productId":"pump","unitPrice":5000,"quantity":2}"#)?;

        assert_eq!(line, RawLineItem::new("pump", 5000.0, 2.0));

        Ok(())
    }
}
