//! Test fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lexis::retrieval::{Candidate, RankedCandidate, RetrievalConfig, Retriever};
use lexis::scoring::{BatchReranker, CandidateReranker, PairScorer, RerankOptions, ScoringError};
use lexis::{
    Document, DocumentMetadata, EmbeddingError, EmbeddingProvider, MockVectorIndex, RerankerError,
};

pub const DIM: usize = 8;

/// Returns the same unit vector for every query.
#[derive(Debug, Default)]
pub struct AxisEmbedder {
    calls: AtomicUsize,
}

impl AxisEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for AxisEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(axis_vector(0.0))
    }
}

/// Embedding backend that is always unreachable.
#[derive(Debug)]
pub struct UnreachableEmbedder;

impl EmbeddingProvider for UnreachableEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::BackendUnavailable {
            reason: "connection refused".to_string(),
        })
    }
}

/// Encoder that blocks its calling thread for `delay` before answering.
#[derive(Debug)]
pub struct InlineSlowEmbedder {
    pub delay: Duration,
}

impl EmbeddingProvider for InlineSlowEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        std::thread::sleep(self.delay);
        Ok(axis_vector(0.0))
    }
}

/// Encoder that runs a `delay`-long blocking forward pass on the blocking pool.
#[derive(Debug)]
pub struct BlockingPoolEmbedder {
    pub delay: Duration,
}

impl EmbeddingProvider for BlockingPoolEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let delay = self.delay;
        tokio::task::spawn_blocking(move || {
            std::thread::sleep(delay);
            axis_vector(0.0)
        })
        .await
        .map_err(|e| EmbeddingError::InferenceFailed {
            reason: e.to_string(),
        })
    }
}

/// Scores each text from a fixed table; unknown texts score `default`.
#[derive(Debug)]
pub struct TableScorer {
    scores: HashMap<String, f32>,
    default: f32,
    calls: AtomicUsize,
}

impl TableScorer {
    pub fn new(entries: &[(String, f32)], default: f32) -> Self {
        Self {
            scores: entries.iter().cloned().collect(),
            default,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PairScorer for TableScorer {
    fn score_batch(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, RerankerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| self.scores.get(t).copied().unwrap_or(self.default))
            .collect())
    }
}

/// Fails every batch after the first `healthy_batches`.
#[derive(Debug)]
pub struct BrokenScorer {
    healthy_batches: usize,
    calls: AtomicUsize,
}

impl BrokenScorer {
    pub fn new(healthy_batches: usize) -> Self {
        Self {
            healthy_batches,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PairScorer for BrokenScorer {
    fn score_batch(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, RerankerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_batches {
            return Err(RerankerError::InferenceFailed {
                reason: "device lost".to_string(),
            });
        }
        Ok(vec![0.9; texts.len()])
    }
}

/// Reranker that takes longer than any sensible timeout.
#[derive(Debug)]
pub struct StalledReranker {
    pub delay: Duration,
}

impl CandidateReranker for StalledReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<RankedCandidate>, ScoringError> {
        tokio::time::sleep(self.delay).await;
        Ok(candidates
            .into_iter()
            .map(|c| RankedCandidate::new(c, 1.0))
            .collect())
    }
}

/// Unit vector at `angle` radians from the query axis in the first plane.
pub fn axis_vector(angle: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[0] = angle.cos();
    v[1] = angle.sin();
    v
}

pub fn article_text(n: usize) -> String {
    format!("Article {} of the Constitution.", n)
}

pub fn article(n: usize) -> Document {
    Document::new(
        format!("art-{}", n),
        article_text(n),
        DocumentMetadata::new(
            "Chapter 1. Fundamentals of the Constitutional System",
            format!("Article {}", n),
            "Constitution of the Russian Federation",
        ),
    )
}

/// Index of `count` articles; article `n` (1-based) is the `n`-th nearest to any query.
pub fn seeded_index(count: usize) -> MockVectorIndex {
    let index = MockVectorIndex::new(DIM);
    for n in 1..=count {
        index
            .insert(article(n), axis_vector(n as f32 * 0.1))
            .expect("fixture embedding has the index dimension");
    }
    index
}

/// Scores article `n` with `scores[n - 1]`.
pub fn article_scores(scores: &[f32]) -> Vec<(String, f32)> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| (article_text(i + 1), *s))
        .collect()
}

pub fn table_reranker(scores: &[f32], batch_size: usize) -> BatchReranker<TableScorer> {
    BatchReranker::new(
        Arc::new(TableScorer::new(&article_scores(scores), 0.0)),
        RerankOptions::default().with_batch_size(batch_size),
    )
    .expect("valid rerank options")
}

pub fn test_config() -> RetrievalConfig {
    RetrievalConfig::default().with_embedding_dim(DIM)
}

pub type TableRetriever = Retriever<AxisEmbedder, Arc<MockVectorIndex>, BatchReranker<TableScorer>>;

/// Retriever over `index` whose cross-encoder returns `scores[n - 1]` for article `n`.
pub fn table_retriever(index: Arc<MockVectorIndex>, scores: &[f32]) -> TableRetriever {
    Retriever::new(AxisEmbedder::default(), index, table_reranker(scores, 3), test_config())
        .expect("valid retriever")
}

pub fn ids(result: &lexis::QueryResult) -> Vec<String> {
    result
        .iter()
        .map(|c| c.candidate.document.id.clone())
        .collect()
}
