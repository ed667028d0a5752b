//! Yahoo Finance v8 chart API client, the primary daily-bar provider.

use crate::config::Asset;
use crate::domain::market::{Bar, PriceSeries};
use crate::domain::ports::BarProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

/// Parallel arrays; entries are null where Yahoo has no data for a slot.
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
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

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarProvider for YahooProvider {
    async fn fetch_daily(&self, asset: &Asset, lookback_days: u32) -> Result<PriceSeries> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, asset.symbol);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0 (compatible; cryptocast)")
            .query(&[
                ("range", format!("{lookback_days}d")),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch Yahoo chart for {}", asset.symbol))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Yahoo chart request for {} returned status {}",
                asset.symbol,
                response.status()
            );
        }

        let body: ChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo chart response")?;

        if let Some(error) = body.chart.error {
            anyhow::bail!("Yahoo chart error for {}: {}", asset.symbol, error);
        }

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .with_context(|| format!("Yahoo chart response for {} has no result", asset.symbol))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        // Slots with any null field are skipped outright.
        let bars: Vec<Bar> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(Bar {
                    date,
                    open: (*quote.open.get(i)?)?,
                    high: (*quote.high.get(i)?)?,
                    low: (*quote.low.get(i)?)?,
                    close: (*quote.close.get(i)?)?,
                    volume: (*quote.volume.get(i)?)?,
                })
            })
            .collect();

        info!(
            "Yahoo returned {} bars for {} (requested {}d)",
            bars.len(),
            asset.symbol,
            lookback_days
        );
        Ok(PriceSeries::new(asset.symbol.clone(), bars))
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
