use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::constants::{DimConfig, validate_embedding_dim};
use crate::embedding::EmbeddingProvider;
use crate::scoring::{CandidateReranker, sort_by_score_desc};
use crate::vectordb::VectorIndex;

use super::config::RetrievalConfig;
use super::context::format_context;
use super::error::{RetrievalError, Stage};
use super::types::{Candidate, QueryResult, RankedCandidate, RetrievalRequest};

/// Two-stage retriever: dense search for a shortlist, cross-encoder rerank, then an
/// inclusive threshold filter and a cap on the result length.
///
/// All three backends are injected and shared read-only by concurrent calls.
pub struct Retriever<E, V, R> {
    embedder: E,
    index: V,
    reranker: R,
    config: RetrievalConfig,
}

impl<E: std::fmt::Debug, V: std::fmt::Debug, R: std::fmt::Debug> std::fmt::Debug
    for Retriever<E, V, R>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder)
            .field("index", &self.index)
            .field("reranker", &self.reranker)
            .field("config", &self.config)
            .finish()
    }
}

impl<E, V, R> Retriever<E, V, R>
where
    E: EmbeddingProvider,
    V: VectorIndex,
    R: CandidateReranker,
{
    pub fn new(embedder: E, index: V, reranker: R, config: RetrievalConfig) -> Result<Self, RetrievalError> {
        config.validate()?;

        DimConfig::new(config.embedding_dim)
            .check(embedder.dim())
            .map_err(|e| RetrievalError::InvalidConfig {
                reason: format!("embedder does not match config: {}", e),
            })?;

        Ok(Self {
            embedder,
            index,
            reranker,
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub fn reranker(&self) -> &R {
        &self.reranker
    }

    /// A request for `query` with this retriever's default parameters.
    pub fn request(&self, query: impl Into<String>) -> RetrievalRequest {
        self.config.request(query)
    }

    /// Runs one retrieval within the configured timeout.
    ///
    /// Backend failures are errors; a query with no sufficiently relevant article
    /// returns an empty [`QueryResult`].
    #[instrument(
        skip_all,
        fields(
            query_len = request.query.len(),
            n_initial = request.n_initial,
            n_final = request.n_final,
        )
    )]
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<QueryResult, RetrievalError> {
        request.validate()?;

        if request.n_final == 0 {
            debug!("n_final is zero, skipping retrieval");
            return Ok(QueryResult::empty());
        }

        let started = Instant::now();
        let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);

        let mut result = tokio::time::timeout(self.config.timeout, self.run_stages(request))
            .await
            .map_err(|_| {
                warn!(timeout_ms, "Retrieval timed out");
                RetrievalError::Timeout { timeout_ms }
            })??;

        result.elapsed = started.elapsed();
        if result.elapsed > self.config.timeout {
            warn!(
                timeout_ms,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Retrieval finished past its timeout"
            );
            return Err(RetrievalError::Timeout { timeout_ms });
        }
        info!(
            results = result.len(),
            shortlist = result.shortlist_len,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Retrieval complete"
        );
        Ok(result)
    }

    async fn run_stages(&self, request: &RetrievalRequest) -> Result<QueryResult, RetrievalError> {
        let embedding = self.embed_query(&request.query).await?;

        let shortlist = self.search(embedding, request.n_initial).await?;
        if shortlist.is_empty() {
            debug!("Vector index returned no candidates");
            return Ok(QueryResult::empty());
        }
        let shortlist_len = shortlist.len();

        let ranked = self.reranker.rerank(&request.query, shortlist).await?;
        if ranked.len() != shortlist_len {
            return Err(RetrievalError::RerankFailure(
                crate::scoring::ScoringError::ScoreCountMismatch {
                    batch: 0,
                    expected: shortlist_len,
                    actual: ranked.len(),
                },
            ));
        }

        let candidates = select(ranked, request.relevance_threshold, request.n_final);
        debug!(
            shortlist = shortlist_len,
            selected = candidates.len(),
            threshold = request.relevance_threshold,
            "Filtered reranked candidates"
        );

        Ok(QueryResult {
            candidates,
            shortlist_len,
            elapsed: Duration::ZERO,
        })
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let embedding = self.embedder.embed(query).await?;

        validate_embedding_dim(embedding.len(), self.config.embedding_dim).map_err(|e| {
            RetrievalError::Unavailable {
                stage: Stage::Embedding,
                reason: format!("malformed embedding: {}", e),
            }
        })?;
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(RetrievalError::Unavailable {
                stage: Stage::Embedding,
                reason: "malformed embedding: non-finite component".to_string(),
            });
        }

        Ok(embedding)
    }

    async fn search(&self, embedding: Vec<f32>, n_initial: usize) -> Result<Vec<Candidate>, RetrievalError> {
        let mut hits = self.index.query(embedding, n_initial as u64).await?;

        if hits.len() > n_initial {
            warn!(
                returned = hits.len(),
                requested = n_initial,
                "Vector index returned more hits than requested, truncating"
            );
            hits.truncate(n_initial);
        }

        debug!(hits = hits.len(), "Vector search complete");
        Ok(hits)
    }

    /// Retrieves with default parameters and renders the grounding context.
    pub async fn context_for(&self, query: &str) -> Result<String, RetrievalError> {
        let result = self.retrieve(&self.request(query)).await?;
        Ok(format_context(&result))
    }

    /// Retrieves each query in turn with default parameters.
    ///
    /// Returns one result per query in input order; a failed query does not stop the
    /// rest.
    pub async fn retrieve_many<I, S>(&self, queries: I) -> Vec<Result<QueryResult, RetrievalError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = Vec::new();
        for query in queries {
            let request = self.request(query.as_ref());
            let outcome = self.retrieve(&request).await;
            if let Err(ref e) = outcome {
                warn!(error = %e, kind = e.kind(), "Query in batch failed");
            }
            results.push(outcome);
        }
        results
    }

    /// Confirms the index is reachable and returns its document count.
    pub async fn check_ready(&self) -> Result<u64, RetrievalError> {
        let count = self.index.document_count().await?;
        info!(documents = count, "Vector index ready");
        Ok(count)
    }
}

/// Orders by descending score (stable), keeps scores `>= threshold` and caps at `n_final`.
pub fn select(mut ranked: Vec<RankedCandidate>, threshold: f32, n_final: usize) -> Vec<RankedCandidate> {
    sort_by_score_desc(&mut ranked);
    ranked.retain(|r| r.meets(threshold));
    ranked.truncate(n_final);
    ranked
}
