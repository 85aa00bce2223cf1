use qdrant_client::Qdrant;
use qdrant_client::qdrant::{CountPointsBuilder, SearchPointsBuilder};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::VectorDbError;
use super::model::candidate_from_scored_point;
use crate::retrieval::Candidate;

/// Read-only query contract of the vector index.
///
/// `query` returns at most `k` documents ordered by ascending cosine distance, each
/// with its text and metadata intact. Implementations must not mutate the index.
pub trait VectorIndex: Send + Sync {
    /// Nearest-neighbour search by cosine distance.
    fn query(
        &self,
        embedding: Vec<f32>,
        k: u64,
    ) -> impl Future<Output = Result<Vec<Candidate>, VectorDbError>> + Send;

    /// Number of stored documents; fails if the collection is missing.
    fn document_count(&self) -> impl Future<Output = Result<u64, VectorDbError>> + Send;
}

impl<V: VectorIndex> VectorIndex for Arc<V> {
    fn query(
        &self,
        embedding: Vec<f32>,
        k: u64,
    ) -> impl Future<Output = Result<Vec<Candidate>, VectorDbError>> + Send {
        (**self).query(embedding, k)
    }

    fn document_count(&self) -> impl Future<Output = Result<u64, VectorDbError>> + Send {
        (**self).document_count()
    }
}

#[derive(Clone)]
/// Qdrant client bound to one document collection.
pub struct QdrantClient {
    client: Qdrant,
    url: String,
    collection: String,
}

impl std::fmt::Debug for QdrantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantClient")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl QdrantClient {
    /// Creates a client for `url` querying `collection`.
    pub fn new(url: &str, collection: &str) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the collection this client reads from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns `true` if the collection exists.
    pub async fn collection_exists(&self) -> Result<bool, VectorDbError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })
    }

    /// Counts stored documents (exact count).
    pub async fn document_count(&self) -> Result<u64, VectorDbError> {
        if !self.collection_exists().await? {
            return Err(VectorDbError::CollectionNotFound {
                collection: self.collection.clone(),
            });
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| VectorDbError::CountFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Searches the collection and converts hits to candidates.
    pub async fn search(&self, embedding: Vec<f32>, k: u64) -> Result<Vec<Candidate>, VectorDbError> {
        let search = SearchPointsBuilder::new(&self.collection, embedding, k).with_payload(true);

        let response = self.client.search_points(search).await.map_err(|e| {
            VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            }
        })?;

        let hits = response.result.len();
        let candidates: Vec<Candidate> = response
            .result
            .into_iter()
            .filter_map(candidate_from_scored_point)
            .collect();

        if candidates.len() < hits {
            warn!(
                collection = %self.collection,
                skipped = hits - candidates.len(),
                "Skipped points without id or text payload"
            );
        }
        debug!(hits = candidates.len(), k, "Qdrant search complete");

        Ok(candidates)
    }
}

impl VectorIndex for QdrantClient {
    async fn query(&self, embedding: Vec<f32>, k: u64) -> Result<Vec<Candidate>, VectorDbError> {
        self.search(embedding, k).await
    }

    async fn document_count(&self) -> Result<u64, VectorDbError> {
        self.document_count().await
    }
}
