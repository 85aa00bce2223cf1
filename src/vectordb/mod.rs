//! Vector index: the dense-search stage.
//!
//! The index itself (HNSW, persistence, ingestion) is Qdrant's concern; this module
//! owns only the read-side query contract and the payload → [`Document`] mapping.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{QdrantClient, VectorIndex};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVectorIndex;
pub use model::{
    Document, DocumentMetadata, candidate_from_scored_point, cosine_distance,
    similarity_to_distance,
};

pub const DEFAULT_COLLECTION_NAME: &str = crate::constants::DEFAULT_COLLECTION_NAME;
