use std::time::Duration;

use crate::constants::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_N_FINAL, DEFAULT_N_INITIAL, DEFAULT_RELEVANCE_THRESHOLD,
    DEFAULT_RETRIEVE_TIMEOUT_MS,
};

use super::error::RetrievalError;
use super::types::RetrievalRequest;

/// Defaults and bounds applied by a [`Retriever`](super::Retriever).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub n_initial: usize,
    pub n_final: usize,
    pub relevance_threshold: f32,
    /// Bound on one `retrieve` call (embedding, search and rerank).
    pub timeout: Duration,
    /// Expected query embedding dimension.
    pub embedding_dim: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_initial: DEFAULT_N_INITIAL,
            n_final: DEFAULT_N_FINAL,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            timeout: Duration::from_millis(DEFAULT_RETRIEVE_TIMEOUT_MS),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl RetrievalConfig {
    pub fn with_n_initial(mut self, n_initial: usize) -> Self {
        self.n_initial = n_initial;
        self
    }

    pub fn with_n_final(mut self, n_final: usize) -> Self {
        self.n_final = n_final;
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.n_final > self.n_initial {
            return Err(RetrievalError::InvalidConfig {
                reason: format!(
                    "n_final ({}) must not exceed n_initial ({})",
                    self.n_final, self.n_initial
                ),
            });
        }
        if !self.relevance_threshold.is_finite() {
            return Err(RetrievalError::InvalidConfig {
                reason: "relevance_threshold must be finite".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(RetrievalError::InvalidConfig {
                reason: "timeout must be non-zero".to_string(),
            });
        }
        if self.embedding_dim == 0 {
            return Err(RetrievalError::InvalidConfig {
                reason: "embedding_dim must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// A request for `query` carrying these defaults.
    pub fn request(&self, query: impl Into<String>) -> RetrievalRequest {
        RetrievalRequest::new(query)
            .n_initial(self.n_initial)
            .n_final(self.n_final)
            .relevance_threshold(self.relevance_threshold)
    }
}
