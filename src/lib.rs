//! Tariff
//!
//! Tariff is a cart pricing engine for rupee-denominated storefronts: it
//! derives subtotal, tax, shipping, grand total and item count from a list of
//! cart line items and a set of pricing rules, and keeps that summary in step
//! with a locally mutated or backend-synchronized cart.
//!
//! ```
//! use rusty_money::{Money, iso::INR};
//! use tariff::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let items = [
//!     LineItem::new("pump", Money::from_minor(500_000, INR), 2)?,
//!     LineItem::new("valve", Money::from_minor(120_000, INR), 1)?,
//! ];
//!
//! let summary = calculate(&items, &PricingRules::default())?;
//!
//! assert_eq!(summary.total(), Money::from_minor(1_321_600, INR));
//! assert_eq!(summary.item_count(), 3);
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod format;
pub mod items;
pub mod money;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod remote;
pub mod rules;
