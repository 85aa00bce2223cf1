use crate::embedding::{Reranker, RerankerError};

/// Scoring-model seam: scores `texts` against `query`, one score per text, in order.
///
/// Calls are blocking and may run on any thread. A score must depend only on its own
/// (query, text) pair, never on the rest of the batch.
pub trait PairScorer: Send + Sync + 'static {
    fn score_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankerError>;
}

impl PairScorer for Reranker {
    fn score_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankerError> {
        Reranker::score_batch(self, query, texts)
    }
}
