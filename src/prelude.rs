//! Tariff prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    format::{format_money, format_rate},
    items::{
        LineItem, LineItemFault, ValidationError,
        raw::{RawLineItem, validate_all},
    },
    pricing::{OrderSummary, PricingError, calculate, calculate_raw},
    products::{Catalog, Product, ProductId},
    receipt::{Receipt, ReceiptError},
    remote::{NormalizedCart, RemoteCart, RemoteError},
    rules::{PricingRules, RulesError},
};
