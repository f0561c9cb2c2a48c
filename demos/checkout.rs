//! Checkout Example
//!
//! Loads a backend cart payload and pricing rules, then prints the
//! confirmation receipt.
//!
//! Use `-c` to pick the cart payload (JSON)
//! Use `-r` to pick a rules file (YAML); the storefront defaults apply otherwise
//! Use `--log-format json` for structured logs (filter with `RUST_LOG`)

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tariff::prelude::*;

/// Log output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

/// Arguments for the checkout example
#[derive(Debug, Parser)]
struct CheckoutArgs {
    /// Backend cart payload
    #[clap(short, long, default_value = "fixtures/carts/storefront.json")]
    cart: PathBuf,

    /// Pricing rules file
    #[clap(short, long)]
    rules: Option<PathBuf>,

    /// Log output format
    #[clap(long, value_enum, default_value = "compact")]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(io::stderr),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(io::stderr),
            )
            .try_init()?,
    }

    Ok(())
}

/// Checkout Example
pub fn main() -> Result<()> {
    let args = CheckoutArgs::parse();

    init_logging(args.log_format)?;

    let rules = match &args.rules {
        Some(path) => PricingRules::load(path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => PricingRules::default(),
    };

    let payload = std::fs::read_to_string(&args.cart)
        .with_context(|| format!("reading cart from {}", args.cart.display()))?;

    let remote = RemoteCart::from_json(&payload)?;

    let mut cart = Cart::new(rules);
    let catalog = cart.sync_remote(&remote)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Receipt::from_cart(&cart)?.write_to(&mut handle, &catalog)?;

    Ok(())
}
