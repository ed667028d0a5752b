//! Configuration for the forecast pipeline.
//!
//! Everything is environment-driven with sensible defaults; the asset
//! catalog itself is fixed at compile time.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Tracked pairs: ticker symbol, display name, CoinGecko coin id.
const ASSET_CATALOG: &[(&str, &str, &str)] = &[
    ("BTC-USD", "Bitcoin", "bitcoin"),
    ("ETH-USD", "Ethereum", "ethereum"),
    ("BNB-USD", "Binance Coin", "binancecoin"),
    ("DOGE-USD", "Dogecoin", "dogecoin"),
    ("SOL-USD", "Solana", "solana"),
];

/// One tracked tradable pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub coingecko_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed catalog the pipeline iterates over.
    pub assets: Vec<Asset>,
    /// Root directory for the series and model caches.
    pub cache_dir: PathBuf,
    /// Maximum age before a cached series stops short-circuiting acquisition.
    pub series_ttl: Duration,
    /// Provider lookback window in days.
    pub lookback_days: u32,
    /// Pause between per-asset acquisitions (provider rate-limit throttle).
    pub request_spacing: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let cache_dir = env::var("CACHE_DIR").unwrap_or_else(|_| "data_cache".to_string());

        let ttl_minutes: u64 = env::var("CACHE_TTL_MINUTES")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .context("Invalid CACHE_TTL_MINUTES")?;

        let lookback_days: u32 = env::var("LOOKBACK_DAYS")
            .unwrap_or_else(|_| "90".to_string())
            .parse()
            .context("Invalid LOOKBACK_DAYS")?;

        let spacing_secs: u64 = env::var("REQUEST_SPACING_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Invalid REQUEST_SPACING_SECS")?;

        Ok(Self {
            assets: catalog(),
            cache_dir: PathBuf::from(cache_dir),
            series_ttl: Duration::from_secs(ttl_minutes * 60),
            lookback_days,
            request_spacing: Duration::from_secs(spacing_secs),
        })
    }
}

pub fn catalog() -> Vec<Asset> {
    ASSET_CATALOG
        .iter()
        .map(|&(symbol, name, coingecko_id)| Asset {
            symbol: symbol.to_string(),
            name: name.to_string(),
            coingecko_id: coingecko_id.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_unique_symbols() {
        let assets = catalog();
        assert_eq!(assets.len(), 5);
        let mut symbols: Vec<_> = assets.iter().map(|a| a.symbol.as_str()).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), assets.len());
    }
}
