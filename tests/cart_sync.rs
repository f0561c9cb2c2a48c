//! Integration test for reconciling a local cart with backend snapshots.
//!
//! The backend is authoritative: a snapshot replaces local lines outright
//! (last write wins), and the cached summary follows it.

use rusty_money::{Money, iso::INR};
use testresult::TestResult;

use tariff::prelude::*;

#[test]
fn local_edits_then_backend_snapshot_wins() -> TestResult {
    let mut cart = Cart::new(PricingRules::default());

    // Rapid local increments before the backend responds
    cart.add("6650e0aa11b2c3d4e5f60010", Money::from_minor(500_000, INR), 1)?;
    cart.add("6650e0aa11b2c3d4e5f60010", Money::from_minor(500_000, INR), 1)?;
    cart.add("6650e0aa11b2c3d4e5f60010", Money::from_minor(500_000, INR), 1)?;

    assert_eq!(cart.summary().item_count(), 3);

    let payload = std::fs::read_to_string("fixtures/carts/storefront.json")?;
    cart.sync_remote(&RemoteCart::from_json(&payload)?)?;

    let pump = ProductId::new("6650e0aa11b2c3d4e5f60010");

    assert_eq!(cart.get(&pump).map(LineItem::quantity), Some(2));
    assert_eq!(cart.summary().item_count(), 3);
    assert_eq!(cart.summary().total(), Money::from_minor(1_321_600, INR));

    Ok(())
}

#[test]
fn summary_serializes_for_the_ui() -> TestResult {
    let payload = std::fs::read_to_string("fixtures/carts/storefront.json")?;

    let mut cart = Cart::new(PricingRules::default());
    cart.sync_remote(&RemoteCart::from_json(&payload)?)?;

    let json = serde_json::to_string(cart.summary())?;

    assert_eq!(
        json,
        r#"{"currency":"INR","subtotal":"11200.00","tax":"2016.00","shipping":"0.00","total":"13216.00","itemCount":3,"lineCount":2}"#
    );

    Ok(())
}

#[test]
fn clearing_after_checkout_resets_summary() -> TestResult {
    let payload = std::fs::read_to_string("fixtures/carts/storefront.json")?;

    let mut cart = Cart::new(PricingRules::default());
    cart.sync_remote(&RemoteCart::from_json(&payload)?)?;

    let confirmed = cart.confirm()?;
    assert_eq!(format_money(&confirmed.total()), "₹13,216.00");

    cart.clear();

    assert!(cart.is_empty());
    assert_eq!(cart.summary().total(), Money::from_minor(0, INR));

    Ok(())
}
