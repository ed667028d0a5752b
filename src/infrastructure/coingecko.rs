//! CoinGecko market-chart client, the secondary (fallback) provider.
//!
//! The free endpoint serves raw price points only, so the ticks are
//! resampled locally into daily OHLC bars. There is no volume feed; the
//! volume column is zero-filled.

use crate::config::Asset;
use crate::domain::market::{Bar, PriceSeries};
use crate::domain::ports::BarProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs, oldest first.
    prices: Vec<(f64, f64)>,
}

pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarProvider for CoinGeckoProvider {
    async fn fetch_daily(&self, asset: &Asset, lookback_days: u32) -> Result<PriceSeries> {
        let url = format!(
            "{}/api/v3/coins/{}/market_chart",
            self.base_url, asset.coingecko_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("days", lookback_days.to_string()),
                ("interval", "daily".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch CoinGecko chart for {}", asset.symbol))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "CoinGecko request for {} returned status {}",
                asset.symbol,
                response.status()
            );
        }

        let body: MarketChartResponse = response
            .json()
            .await
            .context("Failed to parse CoinGecko response")?;

        let bars = resample_daily(&body.prices);
        info!(
            "CoinGecko returned {} ticks for {}, resampled to {} daily bars",
            body.prices.len(),
            asset.symbol,
            bars.len()
        );
        Ok(PriceSeries::new(asset.symbol.clone(), bars))
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

/// Collapses `[timestamp_ms, price]` ticks into one OHLC bar per UTC day:
/// first/max/min/last of the day's prices, zero volume.
fn resample_daily(prices: &[(f64, f64)]) -> Vec<Bar> {
    let mut days: Vec<(NaiveDate, Bar)> = Vec::new();

    for &(ts_ms, price) in prices {
        let Some(dt) = DateTime::from_timestamp_millis(ts_ms as i64) else {
            continue;
        };
        let date = dt.date_naive();

        match days.last_mut() {
            Some((day, bar)) if *day == date => {
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.close = price;
            }
            _ => days.push((
                date,
                Bar {
                    date,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: 0.0,
                },
            )),
        }
    }

    days.into_iter().map(|(_, bar)| bar).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: f64 = 86_400_000.0;

    #[test]
    fn resample_takes_first_max_min_last_per_day() {
        // Two days of intraday ticks.
        let prices = vec![
            (0.0, 10.0),
            (3_600_000.0, 14.0),
            (7_200_000.0, 8.0),
            (10_800_000.0, 12.0),
            (DAY_MS, 20.0),
            (DAY_MS + 3_600_000.0, 18.0),
        ];
        let bars = resample_daily(&prices);
        assert_eq!(bars.len(), 2);

        let first = bars[0];
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 14.0);
        assert_eq!(first.low, 8.0);
        assert_eq!(first.close, 12.0);
        assert_eq!(first.volume, 0.0);

        let second = bars[1];
        assert_eq!(second.open, 20.0);
        assert_eq!(second.close, 18.0);
    }

    #[test]
    fn resample_handles_empty_input() {
        assert!(resample_daily(&[]).is_empty());
    }

    #[test]
    fn resampled_volume_is_always_zero() {
        let prices: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * DAY_MS, 100.0)).collect();
        let bars = resample_daily(&prices);
        assert_eq!(bars.len(), 10);
        assert!(bars.iter().all(|b| b.volume == 0.0));
    }
}
