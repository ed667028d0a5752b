//! Cryptocast - headless direction-forecast pipeline
//!
//! Fetches daily history for the tracked pairs, trains (or reloads) one
//! classifier per pair, and prints a forward prediction for each.
//!
//! # Usage
//! ```sh
//! RUST_LOG=info cargo run -- --cache-dir data_cache
//! ```
//!
//! # Environment Variables
//! - `CACHE_DIR` - cache root directory (default: data_cache)
//! - `CACHE_TTL_MINUTES` - series cache TTL (default: 120)
//! - `LOOKBACK_DAYS` - provider lookback window (default: 90)
//! - `REQUEST_SPACING_SECS` - pause between per-asset fetches (default: 5)

use anyhow::Result;
use clap::Parser;
use cryptocast::application::pipeline::Pipeline;
use cryptocast::config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache root directory (overrides CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Provider lookback window in days (overrides LOOKBACK_DAYS)
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Skip the pause between per-asset fetches
    #[arg(long)]
    no_throttle: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Cryptocast {} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(lookback_days) = args.lookback_days {
        config.lookback_days = lookback_days;
    }
    if args.no_throttle {
        config.request_spacing = Duration::ZERO;
    }

    info!(
        "Tracking {} assets, {}d lookback, cache at {:?}",
        config.assets.len(),
        config.lookback_days,
        config.cache_dir
    );

    let mut pipeline = Pipeline::from_config(config)?;
    let forecasts = pipeline.run().await;

    if forecasts.is_empty() {
        warn!("No predictions available: not enough data could be fetched from any provider");
        return Ok(());
    }

    println!();
    println!(
        "{:<10} {:<14} {:>14} {:>6} {:>8} {:>10}",
        "SYMBOL", "NAME", "PRICE (USD)", "DIR", "P(UP)", "ACCURACY"
    );
    for f in &forecasts {
        println!(
            "{:<10} {:<14} {:>14.2} {:>6} {:>7.1}% {:>9.1}%",
            f.symbol,
            f.name,
            f.current_price,
            if f.predicted_label == 1 { "UP" } else { "DOWN" },
            f.probability_up,
            f.accuracy
        );
    }
    println!();

    Ok(())
}
