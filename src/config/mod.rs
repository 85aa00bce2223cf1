//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `LEXIS_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COLLECTION_NAME, DEFAULT_EMBED_CACHE_CAPACITY, DEFAULT_EMBEDDING_DIM,
    DEFAULT_N_FINAL, DEFAULT_N_INITIAL, DEFAULT_RELEVANCE_THRESHOLD, DEFAULT_RERANK_BATCH_SIZE,
    DEFAULT_RERANK_WORKERS, DEFAULT_RETRIEVE_TIMEOUT_MS,
};
use crate::embedding::{DenseConfig, RerankerConfig};
use crate::retrieval::RetrievalConfig;
use crate::scoring::RerankOptions;

/// Retrieval service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `LEXIS_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding the article embeddings. Default: `constitution_rag`.
    pub collection: String,

    /// Dense encoder model directory. Unset runs the stub encoder.
    pub embedder_path: Option<PathBuf>,

    /// Cross-encoder model directory. Unset runs the lexical stub.
    pub reranker_path: Option<PathBuf>,

    /// Query embedding dimension. Default: `1024`.
    pub embedding_dim: usize,

    /// Shortlist size requested from the index. Default: `10`.
    pub n_initial: usize,

    /// Maximum articles returned. Default: `5`.
    pub n_final: usize,

    /// Minimum rerank score kept (inclusive). Default: `0.5`.
    pub relevance_threshold: f32,

    /// Bound on one retrieval, in milliseconds. Default: `30000`.
    pub timeout_ms: u64,

    /// Candidates per cross-encoder call. Default: `8`.
    pub rerank_batch_size: usize,

    /// Concurrent cross-encoder batches. Default: `2`.
    pub rerank_workers: usize,

    /// Cached query embeddings (0 disables the cache). Default: `1024`.
    pub embed_cache_capacity: u64,
}

/// Default Qdrant URL used when `LEXIS_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            embedder_path: None,
            reranker_path: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            n_initial: DEFAULT_N_INITIAL,
            n_final: DEFAULT_N_FINAL,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            timeout_ms: DEFAULT_RETRIEVE_TIMEOUT_MS,
            rerank_batch_size: DEFAULT_RERANK_BATCH_SIZE,
            rerank_workers: DEFAULT_RERANK_WORKERS,
            embed_cache_capacity: DEFAULT_EMBED_CACHE_CAPACITY,
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "LEXIS_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "LEXIS_COLLECTION";
    const ENV_EMBEDDER_PATH: &'static str = DenseConfig::ENV_MODEL_DIR;
    const ENV_RERANKER_PATH: &'static str = RerankerConfig::ENV_MODEL_PATH;
    const ENV_EMBEDDING_DIM: &'static str = "LEXIS_EMBEDDING_DIM";
    const ENV_N_INITIAL: &'static str = "LEXIS_N_INITIAL";
    const ENV_N_FINAL: &'static str = "LEXIS_N_FINAL";
    const ENV_RELEVANCE_THRESHOLD: &'static str = "LEXIS_RELEVANCE_THRESHOLD";
    const ENV_TIMEOUT_MS: &'static str = "LEXIS_TIMEOUT_MS";
    const ENV_RERANK_BATCH_SIZE: &'static str = "LEXIS_RERANK_BATCH_SIZE";
    const ENV_RERANK_WORKERS: &'static str = "LEXIS_RERANK_WORKERS";
    const ENV_EMBED_CACHE_CAPACITY: &'static str = "LEXIS_EMBED_CACHE_CAPACITY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            collection: Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection),
            embedder_path: Self::parse_optional_path_from_env(Self::ENV_EMBEDDER_PATH),
            reranker_path: Self::parse_optional_path_from_env(Self::ENV_RERANKER_PATH),
            embedding_dim: Self::parse_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?,
            n_initial: Self::parse_from_env(Self::ENV_N_INITIAL, defaults.n_initial)?,
            n_final: Self::parse_from_env(Self::ENV_N_FINAL, defaults.n_final)?,
            relevance_threshold: Self::parse_from_env(
                Self::ENV_RELEVANCE_THRESHOLD,
                defaults.relevance_threshold,
            )?,
            timeout_ms: Self::parse_from_env(Self::ENV_TIMEOUT_MS, defaults.timeout_ms)?,
            rerank_batch_size: Self::parse_from_env(
                Self::ENV_RERANK_BATCH_SIZE,
                defaults.rerank_batch_size,
            )?,
            rerank_workers: Self::parse_from_env(Self::ENV_RERANK_WORKERS, defaults.rerank_workers)?,
            embed_cache_capacity: Self::parse_from_env(
                Self::ENV_EMBED_CACHE_CAPACITY,
                defaults.embed_cache_capacity,
            )?,
        })
    }

    /// Validates paths and retrieval parameters (does not load models).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.embedder_path, &self.reranker_path].into_iter().flatten() {
            Self::require_dir(path)?;
        }

        if self.embedding_dim == 0 {
            return Err(Self::invalid("embedding_dim must be greater than 0"));
        }
        if self.n_final > self.n_initial {
            return Err(ConfigError::InvalidParameters {
                reason: format!(
                    "n_final ({}) must not exceed n_initial ({})",
                    self.n_final, self.n_initial
                ),
            });
        }
        if !self.relevance_threshold.is_finite() {
            return Err(Self::invalid("relevance_threshold must be finite"));
        }
        if self.timeout_ms == 0 {
            return Err(Self::invalid("timeout_ms must be greater than 0"));
        }
        if self.rerank_batch_size == 0 || self.rerank_workers == 0 {
            return Err(Self::invalid(
                "rerank_batch_size and rerank_workers must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::default()
            .with_n_initial(self.n_initial)
            .with_n_final(self.n_final)
            .with_relevance_threshold(self.relevance_threshold)
            .with_timeout(self.timeout())
            .with_embedding_dim(self.embedding_dim)
    }

    pub fn rerank_options(&self) -> RerankOptions {
        RerankOptions::default()
            .with_batch_size(self.rerank_batch_size)
            .with_max_concurrent_batches(self.rerank_workers)
    }

    /// Encoder config; stub mode when no model directory is configured.
    pub fn dense_config(&self) -> DenseConfig {
        let config = match &self.embedder_path {
            Some(path) => DenseConfig::new(path),
            None => DenseConfig::stub(),
        };
        config.with_embedding_dim(self.embedding_dim)
    }

    /// Cross-encoder config; stub mode when no model directory is configured.
    pub fn reranker_config(&self) -> RerankerConfig {
        match &self.reranker_path {
            Some(path) => RerankerConfig::new(path),
            None => RerankerConfig::stub(),
        }
    }

    fn invalid(reason: &str) -> ConfigError {
        ConfigError::InvalidParameters {
            reason: reason.to_string(),
        }
    }

    fn require_dir(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name: var_name,
                    value: value.clone(),
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
    }
}
