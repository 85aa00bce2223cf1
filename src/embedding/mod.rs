//! Embedding + model utilities.
//!
//! - [`dense`] encodes queries for the vector stage.
//! - [`reranker`] provides the cross-encoder model driven by [`crate::scoring`].

/// BERT-family backbones (encoder and classifier heads).
pub mod bert;
/// Memoising wrapper for repeated queries.
pub mod cached;
/// Dense query encoder.
pub mod dense;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// The embedding seam used by the retriever.
pub mod provider;
/// Cross-encoder reranker model.
pub mod reranker;
/// Tokenizer/model loading helpers.
pub mod utils;

pub use cached::CachedEmbedder;
pub use dense::{DENSE_EMBEDDING_DIM, DENSE_MAX_SEQ_LEN, DenseConfig, DenseEmbedder};
pub use error::EmbeddingError;
pub use provider::{EmbeddingProvider, l2_normalize};
pub use reranker::{Reranker, RerankerConfig, RerankerError};
