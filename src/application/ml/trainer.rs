//! Fits, evaluates, and caches the per-asset classifier.

use crate::application::ml::{Forest, ModelArtifact, ModelStore};
use crate::domain::errors::PipelineError;
use crate::domain::features::FeatureRow;
use crate::infrastructure::cache::FileCache;
use tracing::{info, warn};

/// Labeled rows required before a model is fit at all.
pub const MIN_TRAINING_ROWS: usize = 20;

const N_TREES: u16 = 50;
const MAX_DEPTH: u16 = 5;
const SEED: u64 = 42;
const TRAIN_FRACTION: f64 = 0.8;

/// Returns the asset's model, fitting one only when neither the in-memory
/// store nor the disk cache has it. Retraining is cache-miss-driven only:
/// a present artifact is returned as-is without reexamining the data.
pub fn train_or_load<'s>(
    symbol: &str,
    rows: &[FeatureRow],
    cache: &FileCache,
    store: &'s mut ModelStore,
) -> Result<&'s ModelArtifact, PipelineError> {
    if !store.contains(symbol) {
        if let Some(artifact) = cache.read_model(symbol) {
            info!("Loaded cached model for {symbol} (accuracy {:.1}%)", artifact.accuracy);
            store.insert(symbol, artifact);
        } else {
            let artifact = fit(symbol, rows)?;
            info!(
                "Trained model for {symbol}: {} learners, accuracy {:.1}%",
                artifact.model.len(),
                artifact.accuracy
            );
            // A failed cache write costs a retrain next run, nothing more.
            if let Err(e) = cache.write_model(symbol, &artifact) {
                warn!("Failed to cache model for {symbol}: {e:#}");
            }
            store.insert(symbol, artifact);
        }
    }

    store
        .get(symbol)
        .ok_or_else(|| PipelineError::ModelUnavailable {
            symbol: symbol.to_string(),
        })
}

fn fit(symbol: &str, rows: &[FeatureRow]) -> Result<ModelArtifact, PipelineError> {
    let labeled: Vec<(Vec<f64>, u32)> = rows
        .iter()
        .filter_map(|r| Some((r.feature_vector(), r.label?)))
        .collect();

    if labeled.len() < MIN_TRAINING_ROWS {
        return Err(PipelineError::InsufficientData {
            symbol: symbol.to_string(),
            have: labeled.len(),
            need: MIN_TRAINING_ROWS,
        });
    }

    // Chronological split, no shuffling: the test partition is strictly
    // after the train partition.
    let split = (labeled.len() as f64 * TRAIN_FRACTION).floor() as usize;
    let (train, test) = labeled.split_at(split);

    let x_train: Vec<Vec<f64>> = train.iter().map(|(x, _)| x.clone()).collect();
    let y_train: Vec<u32> = train.iter().map(|(_, y)| *y).collect();

    let model = Forest::fit(&x_train, &y_train, N_TREES, MAX_DEPTH, SEED)
        .map_err(|e| training_error(symbol, format!("fit: {e}")))?;

    // The >= 20-row precondition with an 80/20 split means the test
    // partition cannot actually be empty, but an empty one scores 0.
    let accuracy = if test.is_empty() {
        0.0
    } else {
        let x_test: Vec<Vec<f64>> = test.iter().map(|(x, _)| x.clone()).collect();
        let predictions = model
            .predict(&x_test)
            .map_err(|e| training_error(symbol, format!("evaluate: {e}")))?;
        let mut correct = 0usize;
        for (predicted, (_, actual)) in predictions.iter().zip(test.iter()) {
            if predicted == actual {
                correct += 1;
            }
        }
        correct as f64 / test.len() as f64 * 100.0
    };

    Ok(ModelArtifact { accuracy, model })
}

fn training_error(symbol: &str, reason: String) -> PipelineError {
    PipelineError::Training {
        symbol: symbol.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::derive_features;
    use crate::infrastructure::mock::{series_with_closes, synthetic_series};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    fn temp_cache() -> FileCache {
        let dir = std::env::temp_dir().join(format!(
            "cryptocast-trainer-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        FileCache::new(dir, Duration::from_secs(7200)).unwrap()
    }

    /// 20 rising bars then 10 flat: both label classes present, 21 labeled rows.
    fn training_rows() -> Vec<crate::domain::features::FeatureRow> {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend(std::iter::repeat_n(119.0, 10));
        derive_features(&series_with_closes("BTC-USD", &closes))
    }

    #[test]
    fn trains_and_persists_an_artifact() {
        let cache = temp_cache();
        let mut store = ModelStore::new();
        let rows = training_rows();

        let artifact = train_or_load("BTC-USD", &rows, &cache, &mut store).unwrap();
        assert!(artifact.accuracy >= 0.0 && artifact.accuracy <= 100.0);
        assert!(store.contains("BTC-USD"));
        assert!(cache.read_model("BTC-USD").is_some());
    }

    #[test]
    fn too_few_labeled_rows_is_absent_and_writes_nothing() {
        let cache = temp_cache();
        let mut store = ModelStore::new();
        // 23 bars: 14 labeled rows, below the training floor.
        let rows = derive_features(&synthetic_series("BTC-USD", 23));

        let err = train_or_load("BTC-USD", &rows, &cache, &mut store).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { have: 14, need: 20, .. }));
        assert!(!store.contains("BTC-USD"));
        assert!(cache.read_model("BTC-USD").is_none());
    }

    #[test]
    fn monotonic_series_with_one_label_class_still_trains() {
        let cache = temp_cache();
        let mut store = ModelStore::new();
        // Strictly rising closes label every row 1; training must not
        // require both classes to be present.
        let rows = derive_features(&synthetic_series("BTC-USD", 30));
        assert!(rows.iter().all(|r| r.label == Some(1)));

        let artifact = train_or_load("BTC-USD", &rows, &cache, &mut store).unwrap();
        // The held-out partition is also all 1s, so a constant model is exact.
        assert_eq!(artifact.accuracy, 100.0);
        assert!(cache.read_model("BTC-USD").is_some());
    }

    #[test]
    fn unlabeled_rows_never_train() {
        let cache = temp_cache();
        let mut store = ModelStore::new();
        let rows = derive_features(&synthetic_series("BTC-USD", 15));
        assert!(rows.iter().all(|r| r.label.is_none()));

        assert!(train_or_load("BTC-USD", &rows, &cache, &mut store).is_err());
    }

    #[test]
    fn warm_store_returns_identical_artifact_without_refit() {
        let cache = temp_cache();
        let mut store = ModelStore::new();
        let rows = training_rows();

        let first_accuracy = train_or_load("BTC-USD", &rows, &cache, &mut store)
            .unwrap()
            .accuracy;

        // Second call with garbage rows: a refit would fail on them, a
        // cached artifact is returned untouched.
        let garbage: Vec<crate::domain::features::FeatureRow> = Vec::new();
        let second = train_or_load("BTC-USD", &garbage, &cache, &mut store).unwrap();
        assert_eq!(second.accuracy, first_accuracy);
    }

    #[test]
    fn cold_store_loads_from_disk_without_refit() {
        let cache = temp_cache();
        let rows = training_rows();

        let accuracy = {
            let mut store = ModelStore::new();
            train_or_load("BTC-USD", &rows, &cache, &mut store)
                .unwrap()
                .accuracy
        };

        // Fresh store, same cache dir, no usable rows: must load from disk.
        let mut fresh = ModelStore::new();
        let loaded = train_or_load("BTC-USD", &[], &cache, &mut fresh).unwrap();
        assert_eq!(loaded.accuracy, accuracy);
    }
}
