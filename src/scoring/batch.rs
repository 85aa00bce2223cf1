use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::constants::{DEFAULT_RERANK_BATCH_SIZE, DEFAULT_RERANK_WORKERS};
use crate::embedding::Reranker;
use crate::retrieval::{Candidate, RankedCandidate};

use super::error::ScoringError;
use super::scorer::PairScorer;

/// Batching and worker-pool sizing for [`BatchReranker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerankOptions {
    /// Candidates per scoring call.
    pub batch_size: usize,
    /// Batches in flight at once, across all queries sharing the reranker.
    pub max_concurrent_batches: usize,
}

impl Default for RerankOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_RERANK_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_RERANK_WORKERS,
        }
    }
}

impl RerankOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrent_batches(mut self, n: usize) -> Self {
        self.max_concurrent_batches = n;
        self
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.batch_size == 0 {
            return Err(ScoringError::InvalidOptions {
                reason: "batch_size must be non-zero".to_string(),
            });
        }
        if self.max_concurrent_batches == 0 {
            return Err(ScoringError::InvalidOptions {
                reason: "max_concurrent_batches must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Cross-encoder reranking over a bounded pool of blocking workers.
///
/// The shortlist is split into `batch_size` chunks that are scored concurrently (at
/// most `max_concurrent_batches` at a time). Scores are written back by original
/// position before a stable descending sort, so neither batch size nor scheduling
/// can change the output.
pub struct BatchReranker<S> {
    scorer: Arc<S>,
    options: RerankOptions,
    permits: Arc<Semaphore>,
}

impl<S> std::fmt::Debug for BatchReranker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReranker")
            .field("options", &self.options)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl<S> Clone for BatchReranker<S> {
    fn clone(&self) -> Self {
        Self {
            scorer: Arc::clone(&self.scorer),
            options: self.options,
            permits: Arc::clone(&self.permits),
        }
    }
}

impl BatchReranker<Reranker> {
    /// Wraps a loaded cross-encoder model.
    pub fn from_model(model: Reranker, options: RerankOptions) -> Result<Self, ScoringError> {
        Self::new(Arc::new(model), options)
    }
}

impl<S: PairScorer> BatchReranker<S> {
    pub fn new(scorer: Arc<S>, options: RerankOptions) -> Result<Self, ScoringError> {
        options.validate()?;
        Ok(Self {
            scorer,
            options,
            permits: Arc::new(Semaphore::new(options.max_concurrent_batches)),
        })
    }

    pub fn options(&self) -> RerankOptions {
        self.options
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Batches currently being scored.
    pub fn active_batches(&self) -> usize {
        self.options.max_concurrent_batches - self.permits.available_permits()
    }

    /// Scores every candidate against `query` and returns them sorted by descending
    /// score; ties keep their input order.
    #[instrument(skip_all, fields(query_len = query.len(), candidates = candidates.len()))]
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<RankedCandidate>, ScoringError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.score_all(query, &candidates).await?;

        if let Some((index, score)) = scores.iter().enumerate().find(|(_, s)| s.is_nan()) {
            return Err(ScoringError::InvalidScore {
                index,
                score: *score,
            });
        }

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| RankedCandidate::new(candidate, score))
            .collect();

        sort_by_score_desc(&mut ranked);

        debug!(
            top_score = ranked.first().map(|r| r.rerank_score),
            "Reranking complete"
        );
        Ok(ranked)
    }

    async fn score_all(&self, query: &str, candidates: &[Candidate]) -> Result<Vec<f32>, ScoringError> {
        let query: Arc<str> = Arc::from(query);

        let batches = candidates
            .chunks(self.options.batch_size)
            .enumerate()
            .map(|(batch, chunk)| {
                let texts: Vec<String> = chunk.iter().map(|c| c.text().to_string()).collect();
                self.score_chunk(batch, Arc::clone(&query), texts)
            });

        let per_batch = try_join_all(batches).await?;
        Ok(per_batch.into_iter().flatten().collect())
    }

    async fn score_chunk(
        &self,
        batch: usize,
        query: Arc<str>,
        texts: Vec<String>,
    ) -> Result<Vec<f32>, ScoringError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ScoringError::WorkerFailed {
                reason: e.to_string(),
            })?;

        let scorer = Arc::clone(&self.scorer);
        let expected = texts.len();

        let scores = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            scorer.score_batch(&query, &texts)
        })
        .await
        .map_err(|e| ScoringError::WorkerFailed {
            reason: e.to_string(),
        })?
        .map_err(|source| ScoringError::ModelFailed { batch, source })?;

        if scores.len() != expected {
            return Err(ScoringError::ScoreCountMismatch {
                batch,
                expected,
                actual: scores.len(),
            });
        }

        debug!(batch, size = expected, "Batch scored");
        Ok(scores)
    }
}

/// Stable sort by descending rerank score.
///
/// `-0.0` and `0.0` tie, so equal scores always keep their input order.
pub fn sort_by_score_desc(ranked: &mut [RankedCandidate]) {
    ranked.sort_by(|a, b| sort_key(b.rerank_score).total_cmp(&sort_key(a.rerank_score)));
}

/// Folds `-0.0` into `0.0`.
fn sort_key(score: f32) -> f32 {
    score + 0.0
}
