//! Drives the per-asset acquire → derive → train-or-load → predict loop.

use crate::application::ml::{self, ModelStore, PredictionResult};
use crate::config::{Asset, Config};
use crate::domain::errors::PipelineError;
use crate::domain::features::derive_features;
use crate::domain::market::PriceSeries;
use crate::infrastructure::cache::FileCache;
use crate::infrastructure::coingecko::CoinGeckoProvider;
use crate::infrastructure::source::SourceAdapter;
use crate::infrastructure::yahoo::YahooProvider;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Consumer-facing result for one asset. `series` is the raw history for
/// independent chart rendering by the presentation layer.
#[derive(Debug, Clone)]
pub struct AssetForecast {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub predicted_label: u32,
    pub probability_up: f64,
    pub accuracy: f64,
    pub series: PriceSeries,
}

/// Pipeline state: configuration, the two cache kinds, the source adapter,
/// and the process-wide trained-model map.
pub struct Pipeline {
    config: Config,
    cache: FileCache,
    source: SourceAdapter,
    models: ModelStore,
}

impl Pipeline {
    /// Wires the real providers from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = FileCache::new(&config.cache_dir, config.series_ttl)?;
        let source = SourceAdapter::new(
            Arc::new(YahooProvider::new()),
            Arc::new(CoinGeckoProvider::new()),
        );
        Ok(Self::new(config, cache, source))
    }

    /// Assembles a pipeline from pre-built parts (tests inject mocks here).
    pub fn new(config: Config, cache: FileCache, source: SourceAdapter) -> Self {
        Self {
            config,
            cache,
            source,
            models: ModelStore::new(),
        }
    }

    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Runs the whole batch: every catalog asset, sequentially, isolating
    /// per-asset failures. An empty result means no asset produced a
    /// prediction, which callers treat as its own case rather than as a
    /// partially populated batch.
    pub async fn run(&mut self) -> Vec<AssetForecast> {
        let assets = self.config.assets.clone();
        let mut forecasts = Vec::new();

        for (i, asset) in assets.iter().enumerate() {
            self.throttle(i).await;
            match self.run_asset(asset).await {
                Ok(forecast) => forecasts.push(forecast),
                Err(e) => info!("Skipping {}: {e}", asset.symbol),
            }
        }

        info!(
            "Batch complete: {}/{} assets produced forecasts",
            forecasts.len(),
            assets.len()
        );
        forecasts
    }

    /// Explicit training phase: ensures a model exists for every asset the
    /// data allows. Failures are logged per asset and swallowed.
    pub async fn train_models(&mut self) {
        let assets = self.config.assets.clone();
        for (i, asset) in assets.iter().enumerate() {
            self.throttle(i).await;
            let Some(series) = self.acquire(asset).await else {
                info!("No data to train {} with", asset.symbol);
                continue;
            };
            let rows = derive_features(&series);
            if let Err(e) = ml::train_or_load(&asset.symbol, &rows, &self.cache, &mut self.models) {
                info!("Not training {}: {e}", asset.symbol);
            }
        }
    }

    /// One prediction per asset that already has a model; never trains.
    pub async fn predict_all(&mut self) -> HashMap<String, PredictionResult> {
        let assets = self.config.assets.clone();
        let mut results = HashMap::new();

        for (i, asset) in assets.iter().enumerate() {
            self.throttle(i).await;
            let Some(artifact) = self.models.get(&asset.symbol) else {
                info!("No model for {}, skipping prediction", asset.symbol);
                continue;
            };
            let Some(series) = self.acquire(asset).await else {
                continue;
            };
            let rows = derive_features(&series);
            match ml::predict(&asset.symbol, &rows, artifact) {
                Ok(result) => {
                    results.insert(asset.symbol.clone(), result);
                }
                Err(e) => info!("No prediction for {}: {e}", asset.symbol),
            }
        }
        results
    }

    async fn run_asset(&mut self, asset: &Asset) -> Result<AssetForecast, PipelineError> {
        let series = self
            .acquire(asset)
            .await
            .ok_or_else(|| PipelineError::AcquisitionFailed {
                symbol: asset.symbol.clone(),
            })?;

        let current_price =
            series
                .latest_close()
                .ok_or_else(|| PipelineError::AcquisitionFailed {
                    symbol: asset.symbol.clone(),
                })?;

        let rows = derive_features(&series);
        let artifact = ml::train_or_load(&asset.symbol, &rows, &self.cache, &mut self.models)?;
        let prediction = ml::predict(&asset.symbol, &rows, artifact)?;

        Ok(AssetForecast {
            symbol: asset.symbol.clone(),
            name: asset.name.clone(),
            current_price,
            predicted_label: prediction.predicted_label,
            probability_up: prediction.probability_up,
            accuracy: prediction.accuracy,
            series,
        })
    }

    /// Fresh cache → providers (cache updated on success) → stale cache.
    async fn acquire(&self, asset: &Asset) -> Option<PriceSeries> {
        if let Some(series) = self.cache.read_fresh_series(&asset.symbol) {
            return Some(series);
        }

        if let Some(series) = self.source.fetch(asset, self.config.lookback_days).await {
            if let Err(e) = self.cache.write_series(&series) {
                warn!("Failed to cache series for {}: {e:#}", asset.symbol);
            }
            return Some(series);
        }

        // Both providers down: an expired entry beats nothing.
        let stale = self.cache.read_series_any(&asset.symbol);
        if stale.is_some() {
            info!("Serving stale cached series for {}", asset.symbol);
        }
        stale
    }

    /// Fixed pause between per-asset acquisitions. A rate-limit courtesy to
    /// the providers, not a correctness mechanism.
    async fn throttle(&self, index: usize) {
        if index > 0 && !self.config.request_spacing.is_zero() {
            tokio::time::sleep(self.config.request_spacing).await;
        }
    }
}
