// src/core/errors.rs
use thiserror::Error;

/// Every failure the crate can report. None of them are recovered internally:
/// training, explanation and aggregation are deterministic, so retrying a
/// failed call would only reproduce the failure.
#[derive(Debug, Error)]
pub enum IncidentLimeError {
    /// `fit` was called on an empty corpus.
    #[error("Vectorization Error: {0}")]
    Vectorization(String),

    /// Fewer than two distinct labels, or the optimizer diverged.
    #[error("Training Error: {0}")]
    Training(String),

    /// Malformed explanation request (never raised for degenerate text).
    #[error("Explanation Error: {0}")]
    Explanation(String),

    /// The taxonomy has no buckets.
    #[error("Aggregation Error: {0}")]
    Aggregation(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Config Error: {0}")]
    Config(#[from] serde_json::Error),
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, IncidentLimeError>;
