//! Multi-source acquisition: a primary provider retried with increasing
//! pacing, then a secondary provider once, then nothing.
//!
//! Cache fallback is deliberately not handled here; the pipeline layers the
//! cache around this adapter. The adapter holds no per-call state.

use crate::config::Asset;
use crate::domain::market::PriceSeries;
use crate::domain::ports::BarProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pause before primary attempt n: 1s, 6s, 11s.
fn default_backoff() -> Vec<Duration> {
    (0..3u64).map(|i| Duration::from_secs(5 * i + 1)).collect()
}

pub struct SourceAdapter {
    primary: Arc<dyn BarProvider>,
    secondary: Arc<dyn BarProvider>,
    backoff: Vec<Duration>,
}

impl SourceAdapter {
    pub fn new(primary: Arc<dyn BarProvider>, secondary: Arc<dyn BarProvider>) -> Self {
        Self {
            primary,
            secondary,
            backoff: default_backoff(),
        }
    }

    /// Overrides the per-attempt pacing. The schedule length is the number
    /// of primary attempts.
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Fetches a daily series, or `None` when every provider fails within
    /// this call. An `Ok` response with zero bars counts as a failure.
    pub async fn fetch(&self, asset: &Asset, lookback_days: u32) -> Option<PriceSeries> {
        for (attempt, delay) in self.backoff.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            match self.primary.fetch_daily(asset, lookback_days).await {
                Ok(series) if !series.is_empty() => return Some(series),
                Ok(_) => warn!(
                    "{} attempt {} for {} returned an empty series",
                    self.primary.name(),
                    attempt + 1,
                    asset.symbol
                ),
                Err(e) => warn!(
                    "{} attempt {} for {} failed: {e:#}",
                    self.primary.name(),
                    attempt + 1,
                    asset.symbol
                ),
            }
        }

        info!(
            "Primary provider exhausted for {}, trying {}",
            asset.symbol,
            self.secondary.name()
        );
        match self.secondary.fetch_daily(asset, lookback_days).await {
            Ok(series) if !series.is_empty() => Some(series),
            Ok(_) => {
                warn!(
                    "{} returned an empty series for {}",
                    self.secondary.name(),
                    asset.symbol
                );
                None
            }
            Err(e) => {
                warn!("{} failed for {}: {e:#}", self.secondary.name(), asset.symbol);
                None
            }
        }
    }
}
