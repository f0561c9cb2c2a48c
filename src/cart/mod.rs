//! Cart
//!
//! Local cart state. Every successful mutation re-prices the cart and caches
//! the resulting [`OrderSummary`]; a mutation that fails leaves both the
//! lines and the cached summary untouched. The backend remains the source of
//! truth: [`Cart::replace_with`] reconciles local state with a backend
//! snapshot, last write wins.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::debug;

use crate::{
    items::{LineItem, LineItemFault, ValidationError},
    pricing::{OrderSummary, PricingError, calculate},
    products::{Catalog, ProductId},
    remote::{NormalizedCart, RemoteCart},
    rules::PricingRules,
};

new_key_type! {
    /// Cart line key
    struct LineKey;
}

/// Errors related to cart mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A line failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// No line exists for the product.
    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),
}

enum Change<'a> {
    Upsert(LineItem<'a>),
    Remove(LineKey),
    Clear,
    Replace(Vec<LineItem<'a>>),
}

/// Cart
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    lines: SlotMap<LineKey, LineItem<'a>>,
    index: FxHashMap<ProductId, LineKey>,
    order: Vec<LineKey>,
    rules: PricingRules,
    summary: OrderSummary,
}

impl<'a> Cart<'a> {
    /// Create an empty cart priced under the given rules.
    pub fn new(rules: PricingRules) -> Self {
        Cart {
            lines: SlotMap::with_key(),
            index: FxHashMap::default(),
            order: Vec::new(),
            summary: OrderSummary::empty(&rules),
            rules,
        }
    }

    /// Create a cart from existing line items.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the lines cannot be priced under the rules.
    pub fn with_items(
        items: impl IntoIterator<Item = LineItem<'a>>,
        rules: PricingRules,
    ) -> Result<Self, CartError> {
        let mut cart = Self::new(rules);

        cart.replace_with(items)?;

        Ok(cart)
    }

    /// Add a product to the cart.
    ///
    /// Adding a product that is already in the cart increases its quantity
    /// and takes the new unit price.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the line is invalid or the cart cannot be priced.
    pub fn add(
        &mut self,
        product_id: impl Into<ProductId>,
        unit_price: Money<'a, Currency>,
        quantity: u32,
    ) -> Result<&OrderSummary, CartError> {
        let item = LineItem::new(product_id, unit_price, quantity)?;

        self.add_item(item)
    }

    /// Add a validated line to the cart, merging with any existing line for the product.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the merged quantity overflows or the cart cannot be priced.
    pub fn add_item(&mut self, item: LineItem<'a>) -> Result<&OrderSummary, CartError> {
        let merged = match self.get(item.product_id()) {
            Some(existing) => merge(existing, &item)?,
            None => item,
        };

        let product_id = merged.product_id().clone();
        let quantity = merged.quantity();

        self.apply(Change::Upsert(merged))?;

        debug!(%product_id, quantity, "cart line added");

        Ok(&self.summary)
    }

    /// Set the quantity of a product already in the cart. A quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart, or a
    /// [`CartError::Pricing`] if the cart cannot be priced.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<&OrderSummary, CartError> {
        if quantity == 0 {
            self.remove(product_id)?;

            return Ok(&self.summary);
        }

        let mut line = self
            .get(product_id)
            .cloned()
            .ok_or_else(|| CartError::LineNotFound(product_id.clone()))?;

        line.set_quantity(quantity)?;

        self.apply(Change::Upsert(line))?;

        debug!(%product_id, quantity, "cart line quantity updated");

        Ok(&self.summary)
    }

    /// Remove a product from the cart, returning its line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<LineItem<'a>, CartError> {
        let key = *self
            .index
            .get(product_id)
            .ok_or_else(|| CartError::LineNotFound(product_id.clone()))?;

        let removed = self
            .lines
            .get(key)
            .cloned()
            .ok_or_else(|| CartError::LineNotFound(product_id.clone()))?;

        self.apply(Change::Remove(key))?;

        debug!(%product_id, "cart line removed");

        Ok(removed)
    }

    /// Remove every line.
    pub fn clear(&mut self) -> &OrderSummary {
        self.commit(Change::Clear, OrderSummary::empty(&self.rules));

        debug!("cart cleared");

        &self.summary
    }

    /// Replace the cart contents with a backend snapshot.
    ///
    /// Lines for the same product are merged, summing quantities; the last
    /// unit price seen wins.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if merged quantities overflow or the snapshot cannot be priced.
    #[tracing::instrument(
        name = "cart.replace_with",
        skip_all,
        fields(lines = tracing::field::Empty)
    )]
    pub fn replace_with(
        &mut self,
        items: impl IntoIterator<Item = LineItem<'a>>,
    ) -> Result<&OrderSummary, CartError> {
        let merged = merge_duplicates(items)?;

        tracing::Span::current().record("lines", merged.len());

        self.apply(Change::Replace(merged))
    }

    /// Reconcile with a backend cart payload, returning the products it referenced.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if a backend line is invalid or the snapshot cannot be priced.
    pub fn sync_remote(&mut self, remote: &RemoteCart) -> Result<Catalog<'a>, CartError> {
        let normalized: NormalizedCart<'a> = remote.normalize(self.rules.currency())?;

        self.replace_with(normalized.items)?;

        Ok(normalized.catalog)
    }

    /// Re-price the cart under new rules.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::Pricing`] if the lines cannot be priced under the new rules,
    /// in which case the previous rules are kept.
    pub fn set_rules(&mut self, rules: PricingRules) -> Result<&OrderSummary, CartError> {
        let lines: Vec<LineItem<'a>> = self.iter().cloned().collect();
        let summary = calculate(&lines, &rules)?;

        self.rules = rules;
        self.summary = summary;

        Ok(&self.summary)
    }

    /// Recompute the summary from scratch for checkout confirmation.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::Pricing`] if the cart cannot be priced.
    pub fn confirm(&self) -> Result<OrderSummary, CartError> {
        let lines: Vec<LineItem<'a>> = self.iter().cloned().collect();
        let summary = calculate(&lines, &self.rules)?;

        debug!(
            total = summary.total().to_minor_units(),
            items = summary.item_count(),
            "cart confirmed"
        );

        Ok(summary)
    }

    /// The summary as of the last mutation.
    pub fn summary(&self) -> &OrderSummary {
        &self.summary
    }

    /// The rules the cart is priced under.
    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    /// Get the line for a product.
    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem<'a>> {
        self.index
            .get(product_id)
            .and_then(|key| self.lines.get(*key))
    }

    /// Iterate over the lines in the order they were first added.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem<'a>> {
        self.order.iter().filter_map(|key| self.lines.get(*key))
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn apply(&mut self, change: Change<'a>) -> Result<&OrderSummary, CartError> {
        let candidate = self.preview(&change);
        let summary = calculate(&candidate, &self.rules)?;

        self.commit(change, summary);

        Ok(&self.summary)
    }

    /// Lines as they would be after the change.
    fn preview(&self, change: &Change<'a>) -> Vec<LineItem<'a>> {
        match change {
            Change::Upsert(item) => {
                let mut lines: Vec<LineItem<'a>> = self.iter().cloned().collect();

                match lines
                    .iter_mut()
                    .find(|line| line.product_id() == item.product_id())
                {
                    Some(line) => *line = item.clone(),
                    None => lines.push(item.clone()),
                }

                lines
            }
            Change::Remove(key) => self
                .order
                .iter()
                .filter(|k| *k != key)
                .filter_map(|k| self.lines.get(*k))
                .cloned()
                .collect(),
            Change::Clear => Vec::new(),
            Change::Replace(items) => items.clone(),
        }
    }

    fn commit(&mut self, change: Change<'a>, summary: OrderSummary) {
        match change {
            Change::Upsert(item) => self.upsert(item),
            Change::Remove(key) => {
                if let Some(line) = self.lines.remove(key) {
                    self.index.remove(line.product_id());
                }

                self.order.retain(|k| *k != key);
            }
            Change::Clear => self.reset(),
            Change::Replace(items) => {
                self.reset();

                for item in items {
                    self.upsert(item);
                }
            }
        }

        self.summary = summary;
    }

    fn upsert(&mut self, item: LineItem<'a>) {
        if let Some(line) = self
            .index
            .get(item.product_id())
            .and_then(|key| self.lines.get_mut(*key))
        {
            *line = item;
            return;
        }

        let product_id = item.product_id().clone();
        let key = self.lines.insert(item);

        self.index.insert(product_id, key);
        self.order.push(key);
    }

    fn reset(&mut self) {
        self.lines.clear();
        self.index.clear();
        self.order.clear();
    }
}

/// Combine an incoming line with an existing one for the same product.
fn merge<'a>(existing: &LineItem<'a>, incoming: &LineItem<'a>) -> Result<LineItem<'a>, CartError> {
    let quantity = existing
        .quantity()
        .checked_add(incoming.quantity())
        .ok_or_else(|| {
            ValidationError::invalid(
                incoming.product_id().clone(),
                LineItemFault::QuantityTooLarge,
            )
        })?;

    Ok(LineItem::new(
        incoming.product_id().clone(),
        *incoming.unit_price(),
        quantity,
    )?)
}

fn merge_duplicates<'a>(
    items: impl IntoIterator<Item = LineItem<'a>>,
) -> Result<Vec<LineItem<'a>>, CartError> {
    let mut merged: Vec<LineItem<'a>> = Vec::new();
    let mut positions: FxHashMap<ProductId, usize> = FxHashMap::default();

    for (idx, item) in items.into_iter().enumerate() {
        let existing = positions
            .get(item.product_id())
            .and_then(|pos| merged.get_mut(*pos));

        match existing {
            Some(line) => {
                *line = merge(line, &item).map_err(|err| match err {
                    CartError::Validation(err) => CartError::Validation(err.at(idx)),
                    other => other,
                })?;
            }
            None => {
                positions.insert(item.product_id().clone(), merged.len());
                merged.push(item);
            }
        }
    }

    Ok(merged)
}
