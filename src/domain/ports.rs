use crate::config::Asset;
use crate::domain::market::PriceSeries;
use anyhow::Result;
use async_trait::async_trait;

/// A read-only daily-bar source keyed by asset and lookback window.
///
/// Implementations must not retain state between calls; retries and
/// fallback between providers live in the source adapter, not here.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Up to `lookback_days` daily bars, most recent last. An `Ok` with an
    /// empty series is a valid response and is treated by the adapter as a
    /// failed attempt.
    async fn fetch_daily(&self, asset: &Asset, lookback_days: u32) -> Result<PriceSeries>;

    /// Short name for log lines.
    fn name(&self) -> &str;
}
