//! Receipt
//!
//! Checkout confirmation rendering: one table row per cart line followed by
//! the subtotal, tax, shipping and total block.

use std::io;

use rust_decimal::Decimal;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    format::{format_money, format_rate},
    items::LineItem,
    pricing::OrderSummary,
    products::Catalog,
    rules::PricingRules,
};

/// Errors that can occur when building or writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The cart could not be priced for confirmation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A line total overflowed (line position).
    #[error("Line {0} total overflowed")]
    LineOverflow(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Confirmed order: lines and the summary computed from them.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    lines: Vec<LineItem<'a>>,
    summary: OrderSummary,
    tax_rate: Decimal,
}

impl<'a> Receipt<'a> {
    /// Create a receipt from lines and the summary priced from them.
    pub fn new(lines: Vec<LineItem<'a>>, summary: OrderSummary, rules: &PricingRules) -> Self {
        Self {
            lines,
            summary,
            tax_rate: rules.tax_rate(),
        }
    }

    /// Confirm a cart: re-price it from scratch and capture its lines.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError::Cart`] if the cart cannot be priced.
    pub fn from_cart(cart: &Cart<'a>) -> Result<Self, ReceiptError> {
        let summary = cart.confirm()?;

        Ok(Self::new(cart.iter().cloned().collect(), summary, cart.rules()))
    }

    /// Lines on the receipt.
    pub fn lines(&self) -> &[LineItem<'a>] {
        &self.lines
    }

    /// The order summary.
    pub fn summary(&self) -> &OrderSummary {
        &self.summary
    }

    /// Writes the receipt, using `catalog` for product titles.
    ///
    /// # Errors
    ///
    /// Returns an error if a line total overflows or the output cannot be written.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        catalog: &Catalog<'_>,
    ) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Unit Price", "Line Total"]);

        for (idx, line) in self.lines.iter().enumerate() {
            let line_total = line.line_total().ok_or(ReceiptError::LineOverflow(idx))?;

            builder.push_record([
                format!("#{:<3}", idx + 1),
                catalog.title_of(line.product_id()).to_string(),
                line.quantity().to_string(),
                format_money(line.unit_price()),
                format_money(&line_total),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..5), Alignment::right());

        writeln!(out, "\n{table}")?;

        self.write_summary(&mut out)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let summary = &self.summary;

        let shipping = if summary.has_free_shipping() {
            "Free".to_string()
        } else {
            format_money(&summary.shipping())
        };

        let mut rows: SmallVec<[(String, String); 6]> = SmallVec::new();

        rows.push((" Subtotal:".to_string(), format_money(&summary.subtotal())));
        rows.push((
            format!(" Tax ({}):", format_rate(self.tax_rate)),
            format_money(&summary.tax()),
        ));
        rows.push((" Shipping:".to_string(), shipping));
        rows.push((
            " \x1b[1mTotal:\x1b[0m".to_string(),
            format!("\x1b[1m{}\x1b[0m", format_money(&summary.total())),
        ));
        rows.push((" Items:".to_string(), summary.item_count().to_string()));

        if !summary.has_free_shipping() {
            rows.push((
                " Free shipping in:".to_string(),
                format_money(&summary.remaining_for_free_shipping()),
            ));
        }

        let label_width = rows
            .iter()
            .map(|(label, _)| visible_width(label))
            .max()
            .unwrap_or_default();

        let value_width = rows
            .iter()
            .map(|(_, value)| visible_width(value))
            .max()
            .unwrap_or_default();

        for (label, value) in &rows {
            write_summary_line(out, label, value, label_width, value_width)?;
        }

        writeln!(out)?;

        Ok(())
    }
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a right-aligned value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {}{value}",
        "",
        " ".repeat(value_pad)
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::INR};
    use testresult::TestResult;

    use crate::{
        pricing::calculate,
        products::{Product, ProductId},
    };

    use super::*;

    fn lines<'a>() -> Result<Vec<LineItem<'a>>, crate::items::ValidationError> {
        Ok(vec![
            LineItem::new("pump", Money::from_minor(500_000, INR), 2)?,
            LineItem::new("valve", Money::from_minor(120_000, INR), 1)?,
        ])
    }

    fn catalog<'a>() -> Catalog<'a> {
        let mut catalog = Catalog::new();

        catalog.insert(Product {
            id: ProductId::new("pump"),
            title: "Hydraulic Pump".to_string(),
            price: Money::from_minor(500_000, INR),
        });

        catalog
    }

    fn render(
        receipt: &Receipt<'_>,
        catalog: &Catalog<'_>,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();

        receipt.write_to(&mut out, catalog)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn write_to_renders_lines_and_totals() -> TestResult {
        let rules = PricingRules::default();
        let lines = lines()?;
        let summary = calculate(&lines, &rules)?;
        let receipt = Receipt::new(lines, summary, &rules);

        let output = render(&receipt, &catalog())?;

        assert!(output.contains("Hydraulic Pump"), "title from catalog");
        assert!(output.contains("valve"), "falls back to product id");
        assert!(output.contains("₹5,000.00"), "unit price");
        assert!(output.contains("₹10,000.00"), "line total");
        assert!(output.contains("₹11,200.00"), "subtotal");
        assert!(output.contains("Tax (18%):"), "tax label");
        assert!(output.contains("₹2,016.00"), "tax");
        assert!(output.contains("Free"), "free shipping");
        assert!(output.contains("₹13,216.00"), "total");
        assert!(!output.contains("Free shipping in:"), "no nudge above threshold");

        Ok(())
    }

    #[test]
    fn write_to_shows_fee_and_remaining_below_threshold() -> TestResult {
        let rules = PricingRules::default();
        let lines = vec![LineItem::new("valve", Money::from_minor(120_000, INR), 1)?];
        let summary = calculate(&lines, &rules)?;
        let receipt = Receipt::new(lines, summary, &rules);

        let output = render(&receipt, &Catalog::new())?;

        assert!(output.contains("₹500.00"), "flat shipping fee");
        assert!(output.contains("Free shipping in:"), "nudge label");
        assert!(output.contains("₹8,800.00"), "remaining to threshold");

        Ok(())
    }

    #[test]
    fn from_cart_confirms_current_lines() -> TestResult {
        let cart = Cart::with_items(lines()?, PricingRules::default())?;

        let receipt = Receipt::from_cart(&cart)?;

        assert_eq!(receipt.lines().len(), 2);
        assert_eq!(receipt.summary(), cart.summary());

        Ok(())
    }

    #[test]
    fn summary_lines_are_right_aligned() -> TestResult {
        let rules = PricingRules::default();
        let lines = lines()?;
        let summary = calculate(&lines, &rules)?;
        let mut out = Vec::new();

        Receipt::new(lines, summary, &rules).write_summary(&mut out)?;

        let text = String::from_utf8(out)?;
        let widths: Vec<usize> = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(visible_width)
            .collect();

        assert!(
            widths.windows(2).all(|pair| pair.first() == pair.last()),
            "summary lines should share a width: {widths:?}"
        );

        Ok(())
    }

    #[test]
    fn visible_width_ignores_ansi_sequences() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
        assert_eq!(visible_width("₹500.00"), 7);
    }
}
