//! Remote cart payloads
//!
//! The storefront backend returns cart lines shaped as
//! `{ "product": { "_id", "price", "title", ... }, "quantity" }`, either as a
//! bare array or wrapped in `{ "items": [...] }`. This module parses that
//! payload and normalizes it into validated [`LineItem`]s, with
//! `unit_price = product.price`.

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::Deserialize;
use serde_json::Number;
use thiserror::Error;
use tracing::debug;

use crate::{
    items::{LineItem, LineItemFault, ValidationError},
    products::{Catalog, Product, ProductId},
};

/// Errors parsing or normalizing a backend cart payload.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// JSON parsing error
    #[error("Failed to parse cart payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Product as embedded in a backend cart line. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteProduct {
    /// Backend identifier
    #[serde(rename = "_id")]
    pub id: ProductId,

    /// Unit price in major units
    pub price: Number,

    /// Display title
    #[serde(default)]
    pub title: String,
}

/// One backend cart line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteLineItem {
    /// The product
    pub product: RemoteProduct,

    /// Requested quantity
    pub quantity: Number,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { items: Vec<RemoteLineItem> },
    Bare(Vec<RemoteLineItem>),
}

/// A backend cart snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCart {
    /// Lines in backend order
    pub items: Vec<RemoteLineItem>,
}

/// Line items and product details extracted from a backend snapshot.
#[derive(Debug, Clone)]
pub struct NormalizedCart<'a> {
    /// Validated line items, in backend order
    pub items: Vec<LineItem<'a>>,

    /// Products referenced by the lines
    pub catalog: Catalog<'a>,
}

impl RemoteCart {
    /// Parse a backend cart payload.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Json`] if the payload is not a cart.
    pub fn from_json(payload: &str) -> Result<Self, RemoteError> {
        let items = match serde_json::from_str(payload)? {
            Payload::Wrapped { items } | Payload::Bare(items) => items,
        };

        Ok(Self { items })
    }

    /// Normalize every line into a validated [`LineItem`] priced in `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] for the first invalid line, tagged with its
    /// position.
    pub fn normalize<'a>(
        &self,
        currency: &'a Currency,
    ) -> Result<NormalizedCart<'a>, ValidationError> {
        let mut items = Vec::with_capacity(self.items.len());
        let mut catalog = Catalog::new();

        for (idx, line) in self.items.iter().enumerate() {
            let item = line.to_line_item(currency).map_err(|err| err.at(idx))?;

            catalog.insert(Product {
                id: line.product.id.clone(),
                title: line.product.title.clone(),
                price: *item.unit_price(),
            });

            items.push(item);
        }

        debug!(
            lines = items.len(),
            products = catalog.len(),
            currency = currency.iso_alpha_code,
            "normalized remote cart"
        );

        Ok(NormalizedCart { items, catalog })
    }
}

impl RemoteLineItem {
    /// Project this line into a [`LineItem`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLineItem`] if the price or quantity is invalid.
    pub fn to_line_item<'a>(
        &self,
        currency: &'a Currency,
    ) -> Result<LineItem<'a>, ValidationError> {
        let id = self.product.id.clone();

        let Some(price) = number_to_decimal(&self.product.price) else {
            return Err(ValidationError::invalid(id, LineItemFault::PriceOutOfRange));
        };

        let Some(quantity) = number_to_decimal(&self.quantity) else {
            return Err(ValidationError::invalid(id, LineItemFault::QuantityTooLarge));
        };

        LineItem::from_decimal(id, price, quantity, currency)
    }
}

/// Read a JSON number as an exact decimal.
fn number_to_decimal(number: &Number) -> Option<Decimal> {
    let text = number.to_string();

    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}
