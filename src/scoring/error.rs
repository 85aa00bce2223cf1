use thiserror::Error;

use crate::embedding::RerankerError;

/// Reranking failures. Each one is fatal for the query; no default score is ever
/// substituted.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring model failed on batch {batch}: {source}")]
    ModelFailed {
        batch: usize,
        #[source]
        source: RerankerError,
    },

    #[error("batch {batch} returned {actual} scores for {expected} candidates")]
    ScoreCountMismatch {
        batch: usize,
        expected: usize,
        actual: usize,
    },

    #[error("candidate {index} received an invalid score: {score}")]
    InvalidScore { index: usize, score: f32 },

    #[error("scoring worker failed: {reason}")]
    WorkerFailed { reason: String },

    #[error("invalid rerank options: {reason}")]
    InvalidOptions { reason: String },
}
