//! Dense query encoder (BERT / XLM-RoBERTa family, CLS pooling).
//!
//! Use [`DenseConfig::stub`] for tests/examples without model files.

/// Dense encoder configuration.
pub mod config;


pub use config::{DENSE_EMBEDDING_DIM, DENSE_MAX_SEQ_LEN, DenseConfig};

use std::sync::Arc;

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::embedding::bert::BertEncoder;
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::provider::{EmbeddingProvider, l2_normalize};
use crate::embedding::utils::{load_tokenizer_with_truncation, require_model_files};

enum EncoderBackend {
    Model {
        encoder: BertEncoder,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub,
}

/// Embedding generator for query text (supports stub mode).
pub struct DenseEmbedder {
    backend: Arc<EncoderBackend>,
    config: DenseConfig,
}

impl std::fmt::Debug for DenseEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseEmbedder")
            .field(
                "backend",
                &match self.backend.as_ref() {
                    EncoderBackend::Model { device, .. } => format!("Model({:?})", device),
                    EncoderBackend::Stub => "Stub".to_string(),
                },
            )
            .field("embedding_dim", &self.config.embedding_dim)
            .field("max_seq_len", &self.config.max_seq_len)
            .finish()
    }
}

impl DenseEmbedder {
    /// Loads the embedder from a config (stub mode is supported).
    pub fn load(config: DenseConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        if config.testing_stub {
            warn!("Dense embedder running in STUB mode (testing only)");
            return Ok(Self {
                backend: Arc::new(EncoderBackend::Stub),
                config,
            });
        }

        let device = select_device();
        debug!(?device, "Selected compute device for dense embedder");

        require_model_files(&config.model_dir).map_err(|e| EmbeddingError::ModelLoadFailed {
            reason: e.to_string(),
        })?;

        let encoder = BertEncoder::load(&config.model_dir, &device).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to load encoder: {}", e),
            }
        })?;

        if encoder.hidden_size() != config.embedding_dim {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "embedding_dim ({}) does not match model hidden_size ({})",
                    config.embedding_dim,
                    encoder.hidden_size()
                ),
            });
        }

        let tokenizer = load_tokenizer_with_truncation(&config.model_dir, config.max_seq_len)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            })?;

        info!(
            model_dir = %config.model_dir.display(),
            embedding_dim = config.embedding_dim,
            max_seq_len = config.max_seq_len,
            "Dense encoder loaded"
        );

        Ok(Self {
            backend: Arc::new(EncoderBackend::Model {
                encoder,
                tokenizer,
                device,
            }),
            config,
        })
    }

    /// Loads a stub embedder.
    pub fn stub() -> Result<Self, EmbeddingError> {
        Self::load(DenseConfig::stub())
    }

    /// Encodes one string into a unit-length vector on the calling thread.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.backend.encode(text, self.config.embedding_dim)
    }

    /// Returns `true` if running in stub mode.
    pub fn is_stub(&self) -> bool {
        matches!(self.backend.as_ref(), EncoderBackend::Stub)
    }

    /// Returns the embedder configuration.
    pub fn config(&self) -> &DenseConfig {
        &self.config
    }
}

impl EmbeddingProvider for DenseEmbedder {
    fn dim(&self) -> usize {
        self.config.embedding_dim
    }

    /// Model inference runs on the blocking pool.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.is_stub() {
            return self.encode(text);
        }

        let backend = Arc::clone(&self.backend);
        let dim = self.config.embedding_dim;
        let text = text.to_owned();

        tokio::task::spawn_blocking(move || backend.encode(&text, dim))
            .await
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("encoder task failed: {}", e),
            })?
    }
}

impl EncoderBackend {
    fn encode(&self, text: &str, dim: usize) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            EncoderBackend::Model {
                encoder,
                tokenizer,
                device,
            } => encode_with_model(text, encoder, tokenizer, device),
            EncoderBackend::Stub => Ok(encode_stub(text, dim)),
        }
    }
}

fn encode_with_model(
    text: &str,
    encoder: &BertEncoder,
    tokenizer: &Tokenizer,
    device: &Device,
) -> Result<Vec<f32>, EmbeddingError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: e.to_string(),
        })?;

    if encoding.get_ids().is_empty() {
        return Err(EmbeddingError::TokenizationFailed {
            reason: "input produced no tokens".to_string(),
        });
    }

    debug!(
        text_len = text.len(),
        token_count = encoding.get_ids().len(),
        "Encoding query"
    );

    let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
    let type_ids = Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

    let mut embedding = encoder
        .forward(&input_ids, &type_ids, Some(&attention_mask))?
        .squeeze(0)?
        .to_vec1::<f32>()?;

    l2_normalize(&mut embedding);
    Ok(embedding)
}

fn encode_stub(text: &str, dim: usize) -> Vec<f32> {
    let digest = blake3::hash(text.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    let mut state = u64::from_le_bytes(seed);

    let mut embedding: Vec<f32> = (0..dim)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect();

    l2_normalize(&mut embedding);
    embedding
}
