use serde::Serialize;
use std::time::Duration;

use crate::constants::{DEFAULT_N_FINAL, DEFAULT_N_INITIAL, DEFAULT_RELEVANCE_THRESHOLD};
use crate::vectordb::{Document, DocumentMetadata};

use super::error::RetrievalError;

/// Vector-stage hit: a document and its cosine distance to the query (`[0, 2]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub document: Document,
    pub distance: f32,
}

impl Candidate {
    pub fn new(document: Document, distance: f32) -> Self {
        Self { document, distance }
    }

    pub fn text(&self) -> &str {
        &self.document.text
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.document.metadata
    }
}

/// A [`Candidate`] after the cross-encoder has scored it against the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub rerank_score: f32,
}

impl RankedCandidate {
    pub fn new(candidate: Candidate, rerank_score: f32) -> Self {
        Self {
            candidate,
            rerank_score,
        }
    }

    pub fn text(&self) -> &str {
        self.candidate.text()
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        self.candidate.metadata()
    }

    /// Inclusive threshold check.
    #[inline]
    pub fn meets(&self, threshold: f32) -> bool {
        self.rerank_score >= threshold
    }
}

/// Ordered, filtered output of one retrieval.
///
/// Candidates are sorted by descending rerank score. An empty result means no
/// sufficiently relevant article was found; it is not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub candidates: Vec<RankedCandidate>,
    /// Size of the vector-stage shortlist before reranking.
    pub shortlist_len: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedCandidate> {
        self.candidates.iter()
    }

    pub fn into_candidates(self) -> Vec<RankedCandidate> {
        self.candidates
    }
}

impl IntoIterator for QueryResult {
    type Item = RankedCandidate;
    type IntoIter = std::vec::IntoIter<RankedCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a RankedCandidate;
    type IntoIter = std::slice::Iter<'a, RankedCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Parameters of a single `retrieve` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub query: String,
    pub n_initial: usize,
    pub n_final: usize,
    pub relevance_threshold: f32,
}

impl RetrievalRequest {
    /// Request with the built-in defaults (10 / 5 / 0.5).
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            n_initial: DEFAULT_N_INITIAL,
            n_final: DEFAULT_N_FINAL,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }

    pub fn n_initial(mut self, n_initial: usize) -> Self {
        self.n_initial = n_initial;
        self
    }

    pub fn n_final(mut self, n_final: usize) -> Self {
        self.n_final = n_final;
        self
    }

    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.query.trim().is_empty() {
            return Err(RetrievalError::InvalidRequest {
                reason: "query must not be empty".to_string(),
            });
        }
        if self.n_final > self.n_initial {
            return Err(RetrievalError::InvalidRequest {
                reason: format!(
                    "n_final ({}) must not exceed n_initial ({})",
                    self.n_final, self.n_initial
                ),
            });
        }
        if !self.relevance_threshold.is_finite() {
            return Err(RetrievalError::InvalidRequest {
                reason: format!(
                    "relevance_threshold must be finite, got {}",
                    self.relevance_threshold
                ),
            });
        }
        Ok(())
    }
}
