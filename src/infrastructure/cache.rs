//! File-backed cache for raw price series and trained model artifacts.
//!
//! One JSON file per `(symbol, kind)` under a single root directory. Each
//! file is an envelope carrying its own write timestamp, so entry age does
//! not depend on filesystem metadata. Series entries have a TTL; model
//! entries do not (presence alone means "reuse, do not retrain"). An
//! unreadable or unparsable entry behaves as a miss, never as an error.

use crate::application::ml::ModelArtifact;
use crate::domain::market::PriceSeries;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    written_at: DateTime<Utc>,
    payload: T,
}

pub struct FileCache {
    root: PathBuf,
    series_ttl: Duration,
}

impl FileCache {
    /// Opens (and creates if needed) the cache directory.
    pub fn new(root: impl Into<PathBuf>, series_ttl: Duration) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory {root:?}"))?;
        Ok(Self { root, series_ttl })
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.series.json"))
    }

    fn model_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.model.json"))
    }

    /// Cached series plus its age, if a readable entry exists.
    pub fn read_series(&self, symbol: &str) -> Option<(PriceSeries, Duration)> {
        let entry: CacheEntry<PriceSeries> = read_entry(&self.series_path(symbol))?;
        let age = (Utc::now() - entry.written_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Some((entry.payload, age))
    }

    /// Cached series only if it is younger than the TTL.
    pub fn read_fresh_series(&self, symbol: &str) -> Option<PriceSeries> {
        let (series, age) = self.read_series(symbol)?;
        if age < self.series_ttl {
            debug!("Series cache hit for {symbol} (age {}s)", age.as_secs());
            Some(series)
        } else {
            None
        }
    }

    /// Cached series regardless of age. Last-resort fallback when both
    /// providers are down.
    pub fn read_series_any(&self, symbol: &str) -> Option<PriceSeries> {
        self.read_series(symbol).map(|(series, _)| series)
    }

    /// Whole-entry replacement of the cached series.
    pub fn write_series(&self, series: &PriceSeries) -> Result<()> {
        self.write_entry(&self.series_path(&series.symbol), series)
    }

    /// Trained artifact for the symbol, if one was ever persisted.
    pub fn read_model(&self, symbol: &str) -> Option<ModelArtifact> {
        let entry: CacheEntry<ModelArtifact> = read_entry(&self.model_path(symbol))?;
        Some(entry.payload)
    }

    /// Whole-entry replacement of the cached model artifact.
    pub fn write_model(&self, symbol: &str, artifact: &ModelArtifact) -> Result<()> {
        self.write_entry(&self.model_path(symbol), artifact)
    }

    fn write_entry<T: Serialize>(&self, path: &Path, payload: &T) -> Result<()> {
        let entry = CacheEntry {
            written_at: Utc::now(),
            payload,
        };
        let content = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;

        // Atomic write: temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write temp file {temp_path:?}"))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file into {path:?}"))?;

        debug!("Wrote cache entry {path:?}");
        Ok(())
    }

    #[cfg(test)]
    fn backdate_series(&self, symbol: &str, written_at: DateTime<Utc>) {
        let path = self.series_path(symbol);
        let mut entry: CacheEntry<PriceSeries> = read_entry(&path).expect("entry to backdate");
        entry.written_at = written_at;
        fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();
    }
}

/// A missing, unreadable, or corrupt file is a miss; corruption is logged
/// and swallowed, never propagated.
fn read_entry<T: DeserializeOwned>(path: &Path) -> Option<CacheEntry<T>> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Discarding corrupt cache entry {path:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Bar;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU64, Ordering};

    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    fn temp_cache(ttl: Duration) -> FileCache {
        let dir = std::env::temp_dir().join(format!(
            "cryptocast-cache-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        FileCache::new(dir, ttl).unwrap()
    }

    fn sample_series(symbol: &str) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let bars = (0..5)
            .map(|i| Bar {
                date: start + chrono::Days::new(i),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0 + i as f64,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::new(symbol, bars)
    }

    #[test]
    fn series_roundtrip_with_age() {
        let cache = temp_cache(Duration::from_secs(7200));
        let series = sample_series("BTC-USD");
        cache.write_series(&series).unwrap();

        let (read, age) = cache.read_series("BTC-USD").unwrap();
        assert_eq!(read, series);
        assert!(age < Duration::from_secs(60));
        assert_eq!(cache.read_fresh_series("BTC-USD").unwrap(), series);
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let cache = temp_cache(Duration::from_secs(7200));
        assert!(cache.read_series("ETH-USD").is_none());
        assert!(cache.read_fresh_series("ETH-USD").is_none());
        assert!(cache.read_model("ETH-USD").is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let cache = temp_cache(Duration::from_secs(7200));
        fs::write(cache.series_path("BTC-USD"), "{ not json").unwrap();
        assert!(cache.read_series("BTC-USD").is_none());
    }

    #[test]
    fn ttl_boundary_two_hours() {
        let cache = temp_cache(Duration::from_secs(2 * 60 * 60));
        let series = sample_series("BTC-USD");
        cache.write_series(&series).unwrap();

        // 119 minutes old: still fresh.
        cache.backdate_series("BTC-USD", Utc::now() - chrono::Duration::minutes(119));
        assert!(cache.read_fresh_series("BTC-USD").is_some());

        // 121 minutes old: stale for the fresh path, still readable as last resort.
        cache.backdate_series("BTC-USD", Utc::now() - chrono::Duration::minutes(121));
        assert!(cache.read_fresh_series("BTC-USD").is_none());
        assert_eq!(cache.read_series_any("BTC-USD").unwrap(), series);
    }

    #[test]
    fn entries_are_per_symbol() {
        let cache = temp_cache(Duration::from_secs(7200));
        cache.write_series(&sample_series("BTC-USD")).unwrap();
        cache.write_series(&sample_series("ETH-USD")).unwrap();

        let (btc, _) = cache.read_series("BTC-USD").unwrap();
        assert_eq!(btc.symbol, "BTC-USD");
        let (eth, _) = cache.read_series("ETH-USD").unwrap();
        assert_eq!(eth.symbol, "ETH-USD");
    }
}
