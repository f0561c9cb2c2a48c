//! Products

use std::{borrow::Borrow, fmt};

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

/// Opaque product identifier, as issued by the storefront backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Product
#[derive(Debug, Clone, PartialEq)]
pub struct Product<'a> {
    /// Product identifier
    pub id: ProductId,

    /// Product title
    pub title: String,

    /// Product price
    pub price: Money<'a, Currency>,
}

/// Products seen in a cart, keyed by identifier.
///
/// Used for display only; pricing never looks products up here.
#[derive(Debug, Clone, Default)]
pub struct Catalog<'a> {
    products: FxHashMap<ProductId, Product<'a>>,
}

impl<'a> Catalog<'a> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product, returning the previous entry.
    pub fn insert(&mut self, product: Product<'a>) -> Option<Product<'a>> {
        self.products.insert(product.id.clone(), product)
    }

    /// Look up a product by identifier.
    pub fn get(&self, id: &str) -> Option<&Product<'a>> {
        self.products.get(id)
    }

    /// Display title for a product, falling back to its identifier.
    pub fn title_of<'b>(&'b self, id: &'b ProductId) -> &'b str {
        self.get(id.as_str())
            .map_or(id.as_str(), |product| product.title.as_str())
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::INR;

    use super::*;

    fn pump<'a>() -> Product<'a> {
        Product {
            id: ProductId::new("64f0c2a1"),
            title: "Centrifugal Pump 2HP".to_string(),
            price: Money::from_minor(1_250_000, INR),
        }
    }

    #[test]
    fn product_id_blank_detection() {
        assert!(ProductId::new("   ").is_blank());
        assert!(!ProductId::new("64f0c2a1").is_blank());
    }

    #[test]
    fn product_id_displays_raw_value() {
        assert_eq!(ProductId::from("abc").to_string(), "abc");
    }

    #[test]
    fn catalog_title_falls_back_to_id() {
        let mut catalog = Catalog::new();
        catalog.insert(pump());

        let known = ProductId::new("64f0c2a1");
        let unknown = ProductId::new("ffff");

        assert_eq!(catalog.title_of(&known), "Centrifugal Pump 2HP");
        assert_eq!(catalog.title_of(&unknown), "ffff");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn catalog_insert_replaces_existing() {
        let mut catalog = Catalog::new();
        catalog.insert(pump());

        let mut repriced = pump();
        repriced.price = Money::from_minor(1_100_000, INR);

        let previous = catalog.insert(repriced);

        assert_eq!(previous.map(|p| p.price), Some(Money::from_minor(1_250_000, INR)));
        assert_eq!(
            catalog.get("64f0c2a1").map(|p| p.price),
            Some(Money::from_minor(1_100_000, INR))
        );
    }
}
