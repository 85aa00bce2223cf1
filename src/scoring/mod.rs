//! Reranking stage.
//!
//! [`PairScorer`] is the seam to the cross-encoder model; [`CandidateReranker`] is the
//! seam the retriever depends on. [`BatchReranker`] connects the two.

pub mod batch;
pub mod error;
pub mod scorer;


pub use batch::{BatchReranker, RerankOptions, sort_by_score_desc};
pub use error::ScoringError;
pub use scorer::PairScorer;

use std::future::Future;

use crate::retrieval::{Candidate, RankedCandidate};

/// Reorders a shortlist by cross-encoder relevance.
///
/// Returns the same candidates, each annotated with its score, sorted by descending
/// score with ties in input order. Any scoring failure fails the whole call.
pub trait CandidateReranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> impl Future<Output = Result<Vec<RankedCandidate>, ScoringError>> + Send;
}

impl<S: PairScorer> CandidateReranker for BatchReranker<S> {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<RankedCandidate>, ScoringError> {
        BatchReranker::rerank(self, query, candidates).await
    }
}

impl<R: CandidateReranker> CandidateReranker for std::sync::Arc<R> {
    fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> impl Future<Output = Result<Vec<RankedCandidate>, ScoringError>> + Send {
        (**self).rerank(query, candidates)
    }
}
