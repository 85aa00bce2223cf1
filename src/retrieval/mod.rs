//! Retrieval orchestration: embed → search → rerank → filter.

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod types;


pub use config::RetrievalConfig;
pub use context::{EXCERPT_CHARS, SourceRef, excerpt, format_context, sources};
pub use error::{RetrievalError, Stage};
pub use pipeline::{Retriever, select};
pub use types::{Candidate, QueryResult, RankedCandidate, RetrievalRequest};
