//! Query-embedding cache.
//!
//! Repeated questions skip the encoder. Keys are the BLAKE3 hash of the exact query
//! text; only successful embeddings are stored.

use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;

/// Wraps an [`EmbeddingProvider`] with a bounded in-memory cache.
pub struct CachedEmbedder<E> {
    inner: E,
    entries: Cache<[u8; 32], Arc<Vec<f32>>>,
}

impl<E: std::fmt::Debug> std::fmt::Debug for CachedEmbedder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEmbedder")
            .field("inner", &self.inner)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl<E: EmbeddingProvider> CachedEmbedder<E> {
    /// Creates a cache holding at most `capacity` query embeddings.
    pub fn new(inner: E, capacity: u64) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Approximate number of cached embeddings.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl<E: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<E> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = *blake3::hash(text.as_bytes()).as_bytes();

        if let Some(hit) = self.entries.get(&key) {
            debug!(text_len = text.len(), "Query embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.embed(text).await?;
        self.entries.insert(key, Arc::new(embedding.clone()));
        Ok(embedding)
    }
}
