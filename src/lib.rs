//! Lexis: two-stage article retrieval for grounded question answering.
//!
//! A query is embedded, the vector index returns a shortlist by cosine distance, a
//! cross-encoder rescores the shortlist, and the best articles above a relevance
//! threshold are returned as grounding context for an answer-generation step.
//!
//! ## Modules
//! - [`retrieval`] - [`Retriever`], request/result types, context formatting
//! - [`scoring`] - [`BatchReranker`] and the reranking seams
//! - [`embedding`] - [`DenseEmbedder`], [`CachedEmbedder`], the [`Reranker`] model
//! - [`vectordb`] - [`VectorIndex`] and the Qdrant-backed [`QdrantClient`]
//! - [`config`] - [`Config`] loaded from `LEXIS_*` environment variables
//!
//! ## Test/Mock Support
//! [`MockVectorIndex`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod embedding;
pub mod retrieval;
pub mod scoring;
pub mod vectordb;

pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use embedding::{
    CachedEmbedder, DenseConfig, DenseEmbedder, EmbeddingError, EmbeddingProvider, Reranker,
    RerankerConfig, RerankerError,
};
pub use retrieval::{
    Candidate, QueryResult, RankedCandidate, RetrievalConfig, RetrievalError, RetrievalRequest,
    Retriever, SourceRef, Stage, format_context,
};
pub use scoring::{BatchReranker, CandidateReranker, PairScorer, RerankOptions, ScoringError};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorIndex;
pub use vectordb::{
    DEFAULT_COLLECTION_NAME, Document, DocumentMetadata, QdrantClient, VectorDbError, VectorIndex,
};
