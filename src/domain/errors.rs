use thiserror::Error;

/// Failure kinds produced by the pipeline stages.
///
/// None of these abort a batch: the orchestrator logs the variant for the
/// affected asset and moves on. They exist so each stage can state *why* an
/// asset dropped out instead of returning a bare `None`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no usable price data for {symbol}: both providers failed and cache is empty")]
    AcquisitionFailed { symbol: String },

    #[error("insufficient data for {symbol}: {have} labeled rows, need {need}")]
    InsufficientData {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("no trained model available for {symbol}")]
    ModelUnavailable { symbol: String },

    #[error("scoring failed for {symbol}: {reason}")]
    Scoring { symbol: String, reason: String },

    #[error("training failed for {symbol}: {reason}")]
    Training { symbol: String, reason: String },
}
