//! Cross-encoder relevance model.
//!
//! Scores a (query, passage) pair jointly and returns the raw classifier logit. Scores
//! are unbounded; only their order and the comparison with a relevance threshold mean
//! anything. Ordering and filtering live in [`crate::scoring`].

pub mod config;
pub mod error;


pub use config::{MAX_SEQ_LEN, RerankerConfig};
pub use error::RerankerError;

use std::collections::HashSet;

use candle_core::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::embedding::bert::BertClassifier;
use crate::embedding::device::select_device;
use crate::embedding::utils::{load_tokenizer_with_truncation, require_model_files};

/// Words ignored by the stub scorer (English and Russian function words).
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "can", "to", "of", "in", "for",
    "on", "with", "at", "by", "from", "as", "into", "and", "but", "if", "or", "not", "no",
    "what", "which", "who", "how", "when", "where", "why", "this", "that", "these", "those",
    "it", "its", "и", "в", "во", "на", "с", "со", "по", "о", "об", "к", "у", "из", "за", "от",
    "до", "не", "что", "как", "какие", "какой", "это", "для", "или", "ли", "же",
];

pub struct Reranker {
    device: candle_core::Device,
    config: RerankerConfig,
    model: Option<(BertClassifier, Tokenizer)>,
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .field("model_loaded", &self.is_model_loaded())
            .finish()
    }
}

impl Reranker {
    pub fn load(config: RerankerConfig) -> Result<Self, RerankerError> {
        config
            .validate()
            .map_err(|reason| RerankerError::InvalidConfig { reason })?;

        let device = select_device();
        debug!(?device, "Selected compute device for reranker");

        let Some(model_path) = config.model_path.clone() else {
            warn!("No reranker model path configured, using lexical stub scorer");
            return Ok(Self {
                device,
                config,
                model: None,
            });
        };

        if !model_path.is_dir() {
            return Err(RerankerError::ModelNotFound { path: model_path });
        }

        require_model_files(&model_path).map_err(|e| RerankerError::ModelLoadFailed {
            reason: e.to_string(),
        })?;

        info!(model_path = %model_path.display(), "Loading reranker model");

        let model = BertClassifier::load(&model_path, &device).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load cross-encoder: {}", e),
            }
        })?;

        let tokenizer = load_tokenizer_with_truncation(&model_path, config.max_seq_len).map_err(
            |e| RerankerError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            },
        )?;

        info!(max_seq_len = config.max_seq_len, "Reranker model loaded");

        Ok(Self {
            device,
            config,
            model: Some((model, tokenizer)),
        })
    }

    pub fn stub() -> Result<Self, RerankerError> {
        Self::load(RerankerConfig::stub())
    }

    /// Scores a single (query, passage) pair.
    pub fn score(&self, query: &str, passage: &str) -> Result<f32, RerankerError> {
        match &self.model {
            Some((model, tokenizer)) => self.score_with_model(model, tokenizer, query, passage),
            None => Ok(lexical_overlap_score(query, passage)),
        }
    }

    /// Scores every passage against `query`, preserving input order.
    ///
    /// Each pair gets its own forward pass, so a passage's score never depends on
    /// which other passages share its batch.
    pub fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>, RerankerError> {
        debug!(
            query_len = query.len(),
            batch = passages.len(),
            model_loaded = self.is_model_loaded(),
            "Scoring batch"
        );

        passages
            .iter()
            .map(|passage| self.score(query, passage))
            .collect()
    }

    fn score_with_model(
        &self,
        model: &BertClassifier,
        tokenizer: &Tokenizer,
        query: &str,
        passage: &str,
    ) -> Result<f32, RerankerError> {
        let tokens = tokenizer.encode((query, passage), true).map_err(|e| {
            RerankerError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(tokens.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = model
            .forward(&token_ids, &type_ids, Some(&attention_mask))
            .map_err(|e| RerankerError::InferenceFailed {
                reason: e.to_string(),
            })?;

        let values = logits.flatten_all()?.to_vec1::<f32>()?;
        values
            .first()
            .copied()
            .ok_or_else(|| RerankerError::InferenceFailed {
                reason: "classifier produced no logits".to_string(),
            })
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    pub fn device(&self) -> &candle_core::Device {
        &self.device
    }
}

fn content_terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Deterministic stand-in for the cross-encoder: query-term recall blended with
/// Jaccard overlap, squashed through a logistic curve into `(0, 1)`.
fn lexical_overlap_score(query: &str, passage: &str) -> f32 {
    let query_terms = content_terms(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let passage_terms = content_terms(passage);

    let matches = query_terms.intersection(&passage_terms).count() as f32;
    let union = query_terms.union(&passage_terms).count() as f32;

    let recall = matches / query_terms.len() as f32;
    let jaccard = if union > 0.0 { matches / union } else { 0.0 };
    let overlap = 0.6 * recall + 0.4 * jaccard;

    1.0 / (1.0 + (-8.0 * (overlap - 0.5)).exp())
}
