//! Scores the most recent feature row against a cached model.

use crate::application::ml::{ModelArtifact, PredictionResult};
use crate::domain::errors::PipelineError;
use crate::domain::features::FeatureRow;

/// Produces one forward prediction from the latest row. Never trains; a
/// missing artifact is the caller's problem. Any scoring failure maps to
/// `PipelineError::Scoring` so the batch can drop the asset and continue.
pub fn predict(
    symbol: &str,
    rows: &[FeatureRow],
    artifact: &ModelArtifact,
) -> Result<PredictionResult, PipelineError> {
    let latest = rows.last().ok_or_else(|| PipelineError::InsufficientData {
        symbol: symbol.to_string(),
        have: 0,
        need: 1,
    })?;

    // feature_vector() already excludes the label and the raw future close.
    let input = vec![latest.feature_vector()];

    let predicted_label = artifact
        .model
        .predict(&input)
        .map_err(|e| scoring_error(symbol, format!("predict: {e}")))?
        .first()
        .copied()
        .ok_or_else(|| scoring_error(symbol, "empty prediction".to_string()))?;

    let probability_up = artifact
        .model
        .predict_proba(&input)
        .map_err(|e| scoring_error(symbol, format!("class probability: {e}")))?
        .first()
        .copied()
        .ok_or_else(|| scoring_error(symbol, "empty probability".to_string()))?
        * 100.0;

    Ok(PredictionResult {
        symbol: symbol.to_string(),
        predicted_label,
        probability_up,
        accuracy: artifact.accuracy,
    })
}

fn scoring_error(symbol: &str, reason: String) -> PipelineError {
    PipelineError::Scoring {
        symbol: symbol.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::{ModelStore, train_or_load};
    use crate::domain::features::derive_features;
    use crate::infrastructure::cache::FileCache;
    use crate::infrastructure::mock::series_with_closes;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    fn temp_cache() -> FileCache {
        let dir = std::env::temp_dir().join(format!(
            "cryptocast-predictor-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        FileCache::new(dir, Duration::from_secs(7200)).unwrap()
    }

    fn trained_artifact_and_rows() -> (ModelArtifact, Vec<FeatureRow>) {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend(std::iter::repeat_n(119.0, 10));
        let rows = derive_features(&series_with_closes("BTC-USD", &closes));

        let cache = temp_cache();
        let mut store = ModelStore::new();
        train_or_load("BTC-USD", &rows, &cache, &mut store).unwrap();
        (cache.read_model("BTC-USD").unwrap(), rows)
    }

    #[test]
    fn prediction_fields_are_in_range() {
        let (artifact, rows) = trained_artifact_and_rows();
        let result = predict("BTC-USD", &rows, &artifact).unwrap();

        assert!(result.predicted_label == 0 || result.predicted_label == 1);
        assert!(result.probability_up >= 0.0 && result.probability_up <= 100.0);
        assert_eq!(result.symbol, "BTC-USD");
    }

    #[test]
    fn single_class_model_predicts_its_class_with_certainty() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rows = derive_features(&series_with_closes("ETH-USD", &closes));

        let cache = temp_cache();
        let mut store = ModelStore::new();
        let artifact = train_or_load("ETH-USD", &rows, &cache, &mut store).unwrap();

        let result = predict("ETH-USD", &rows, artifact).unwrap();
        assert_eq!(result.predicted_label, 1);
        assert_eq!(result.probability_up, 100.0);
    }

    #[test]
    fn accuracy_is_the_stored_figure_not_recomputed() {
        let (artifact, rows) = trained_artifact_and_rows();
        let result = predict("BTC-USD", &rows, &artifact).unwrap();
        assert_eq!(result.accuracy, artifact.accuracy);
    }

    #[test]
    fn empty_row_sequence_is_rejected() {
        let (artifact, _) = trained_artifact_and_rows();
        let err = predict("BTC-USD", &[], &artifact).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }
}
