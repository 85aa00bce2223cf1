//! In-memory [`VectorIndex`] with exact cosine search and failure injection.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::client::VectorIndex;
use super::error::VectorDbError;
use super::model::{Document, cosine_distance};
use crate::retrieval::Candidate;

const MOCK_URL: &str = "mock://vector-index";

struct StoredDocument {
    document: Document,
    embedding: Vec<f32>,
}

pub struct MockVectorIndex {
    vector_size: usize,
    documents: RwLock<Vec<StoredDocument>>,
    failure: RwLock<Option<String>>,
    queries: AtomicUsize,
}

impl std::fmt::Debug for MockVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockVectorIndex")
            .field("vector_size", &self.vector_size)
            .field("documents", &self.len())
            .finish_non_exhaustive()
    }
}

impl MockVectorIndex {
    pub fn new(vector_size: usize) -> Self {
        Self {
            vector_size,
            documents: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
            queries: AtomicUsize::new(0),
        }
    }

    /// Stores a document; insertion order breaks distance ties.
    pub fn insert(&self, document: Document, embedding: Vec<f32>) -> Result<(), VectorDbError> {
        if embedding.len() != self.vector_size {
            return Err(VectorDbError::InvalidDimension {
                expected: self.vector_size,
                actual: embedding.len(),
            });
        }

        self.documents.write().push(StoredDocument {
            document,
            embedding,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every subsequent call fail as if the backend were unreachable.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write() = Some(message.into());
    }

    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Number of `query` calls received (including failed ones).
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), VectorDbError> {
        match self.failure.read().as_ref() {
            Some(message) => Err(VectorDbError::ConnectionFailed {
                url: MOCK_URL.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl VectorIndex for MockVectorIndex {
    async fn query(&self, embedding: Vec<f32>, k: u64) -> Result<Vec<Candidate>, VectorDbError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if embedding.len() != self.vector_size {
            return Err(VectorDbError::InvalidDimension {
                expected: self.vector_size,
                actual: embedding.len(),
            });
        }

        let mut hits: Vec<Candidate> = self
            .documents
            .read()
            .iter()
            .map(|stored| {
                Candidate::new(
                    stored.document.clone(),
                    cosine_distance(&embedding, &stored.embedding),
                )
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(usize::try_from(k).unwrap_or(usize::MAX));

        Ok(hits)
    }

    async fn document_count(&self) -> Result<u64, VectorDbError> {
        self.check_available()?;
        Ok(self.len() as u64)
    }
}
