//! Per-asset direction models: training, persistence, and scoring.

mod forest;
mod predictor;
mod trainer;

pub use forest::Forest;
pub use predictor::predict;
pub use trainer::{MIN_TRAINING_ROWS, train_or_load};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A trained classifier plus the held-out accuracy recorded at fit time.
/// Immutable once created; a retrain replaces the whole artifact.
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Test-partition accuracy as a percentage in `[0, 100]`.
    pub accuracy: f64,
    pub model: Forest,
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("accuracy", &self.accuracy)
            .field("learners", &self.model.len())
            .finish()
    }
}

/// One forward prediction for one asset. Recomputed per request, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub symbol: String,
    /// Hard decision: 1 = close expected higher after the horizon.
    pub predicted_label: u32,
    /// Model probability of label 1, as a percentage in `[0, 100]`.
    pub probability_up: f64,
    /// The artifact's stored accuracy; not recomputed at request time.
    pub accuracy: f64,
}

/// Process-wide map of trained models, owned by the pipeline state.
/// Empty at startup, populated by `train_or_load`, never implicitly cleared.
#[derive(Default)]
pub struct ModelStore {
    models: HashMap<String, ModelArtifact>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&ModelArtifact> {
        self.models.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.models.contains_key(symbol)
    }

    pub fn insert(&mut self, symbol: impl Into<String>, artifact: ModelArtifact) {
        self.models.insert(symbol.into(), artifact);
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}
