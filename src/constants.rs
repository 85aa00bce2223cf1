//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is fixed per deployment: the query embedder and the stored
//! collection must agree on it. If you need a runtime-configurable dimension:
//!
//! 1. Use [`DimConfig`] to pass dimensions through initialization
//! 2. Use [`validate_embedding_dim`] at module boundaries to catch mismatches early
//! 3. The compile-time constants remain as defaults

/// Output dimension of bge-m3 style dense encoders.
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;

/// Shortlist size requested from the vector index.
pub const DEFAULT_N_INITIAL: usize = 10;

/// Number of passages handed to answer generation.
pub const DEFAULT_N_FINAL: usize = 5;

/// Inclusive lower bound on the cross-encoder score.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.5;

/// Upper bound on a whole `retrieve` call (embedding + search + rerank).
pub const DEFAULT_RETRIEVE_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_RERANK_BATCH_SIZE: usize = 8;

/// Scoring-model batches allowed in flight across all queries.
pub const DEFAULT_RERANK_WORKERS: usize = 2;

/// Token limit for encoder and cross-encoder inputs.
pub const DEFAULT_MAX_SEQ_LEN: usize = 512;

pub const DEFAULT_EMBED_CACHE_CAPACITY: u64 = 1024;

pub const DEFAULT_COLLECTION_NAME: &str = "constitution_rag";

const _: () = assert!(DEFAULT_N_FINAL <= DEFAULT_N_INITIAL);

/// Runtime dimension configuration for modules that need to agree on vector sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration with the specified embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Returns an error if `embedding_dim` is zero.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }

    /// Checks a produced vector against this configuration.
    pub fn check(&self, actual: usize) -> Result<(), DimValidationError> {
        validate_embedding_dim(actual, self.embedding_dim)
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use lexis::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// let embedder_dim = 1024;
/// validate_embedding_dim(embedder_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_dim_config_validate_zero() {
        let config = DimConfig::new(0);
        assert_eq!(config.validate(), Err(DimValidationError::ZeroDimension));
    }

    #[test]
    fn test_dim_config_check() {
        let config = DimConfig::new(384);
        assert!(config.check(384).is_ok());
        assert_eq!(
            config.check(1024),
            Err(DimValidationError::DimensionMismatch {
                expected: 384,
                actual: 1024
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = DimValidationError::ZeroDimension;
        assert_eq!(err.to_string(), "embedding dimension cannot be zero");

        let err = DimValidationError::DimensionMismatch {
            expected: 1024,
            actual: 768,
        };
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("768"));
    }
}
