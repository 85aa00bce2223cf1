use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::scoring::ScoringError;
use crate::vectordb::VectorDbError;

/// Backend stage that failed before reranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Index,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Embedding => write!(f, "embedding"),
            Stage::Index => write!(f, "vector index"),
        }
    }
}

/// Failure of a `retrieve` call. An empty result is never represented here.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid retrieval request: {reason}")]
    InvalidRequest { reason: String },

    #[error("invalid retrieval config: {reason}")]
    InvalidConfig { reason: String },

    /// Embedding provider or vector index unreachable or returned garbage.
    #[error("{stage} backend unavailable: {reason}")]
    Unavailable { stage: Stage, reason: String },

    #[error("rerank failed: {0}")]
    RerankFailure(#[from] ScoringError),

    #[error("retrieval timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl RetrievalError {
    /// Stable identifier for callers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::InvalidRequest { .. } => "invalid_request",
            RetrievalError::InvalidConfig { .. } => "invalid_config",
            RetrievalError::Unavailable { .. } => "retrieval_unavailable",
            RetrievalError::RerankFailure(_) => "rerank_failure",
            RetrievalError::Timeout { .. } => "retrieval_timeout",
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RetrievalError::Unavailable { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetrievalError::Timeout { .. })
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        RetrievalError::Unavailable {
            stage: Stage::Embedding,
            reason: err.to_string(),
        }
    }
}

impl From<VectorDbError> for RetrievalError {
    fn from(err: VectorDbError) -> Self {
        RetrievalError::Unavailable {
            stage: Stage::Index,
            reason: err.to_string(),
        }
    }
}
