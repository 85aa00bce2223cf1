//! End-to-end retrieval tests against in-memory backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{
    AxisEmbedder, BlockingPoolEmbedder, BrokenScorer, InlineSlowEmbedder, StalledReranker,
    UnreachableEmbedder, article_text, ids, seeded_index, table_reranker, table_retriever,
    test_config,
};
use lexis::retrieval::{RetrievalError, RetrievalRequest, Retriever, Stage};
use lexis::scoring::{BatchReranker, RerankOptions, ScoringError};
use lexis::{
    CachedEmbedder, DenseConfig, DenseEmbedder, Document, DocumentMetadata, EmbeddingProvider,
    MockVectorIndex, Reranker,
};
use tokio_test::{assert_err, assert_ok};

const TEN_SCORES: [f32; 10] = [0.2, 0.95, 0.6, 0.05, 0.8, 0.5, 0.7, 0.3, 0.9, 0.55];

#[tokio::test]
async fn test_result_never_exceeds_n_final() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(Arc::clone(&index), &[1.0; 10]);

    for n_initial in 0..=12 {
        for n_final in 0..=n_initial {
            let request = RetrievalRequest::new("What does the Constitution say?")
                .n_initial(n_initial)
                .n_final(n_final);
            let result = assert_ok!(retriever.retrieve(&request).await);

            assert!(result.len() <= n_final);
            assert_eq!(result.len(), n_final.min(n_initial.min(10)));
        }
    }
}

#[tokio::test]
async fn test_shortlist_bounded_by_n_initial() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(Arc::clone(&index), &[1.0; 10]);

    let request = RetrievalRequest::new("q").n_initial(4).n_final(4);
    let result = assert_ok!(retriever.retrieve(&request).await);

    assert_eq!(result.shortlist_len, 4);
    assert_eq!(ids(&result), vec!["art-1", "art-2", "art-3", "art-4"]);
    assert_eq!(retriever.reranker().scorer().calls(), 2);
}

#[tokio::test]
async fn test_result_sorted_by_descending_score() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(index, &TEN_SCORES);

    let request = RetrievalRequest::new("q").n_final(10).relevance_threshold(f32::MIN);
    let result = assert_ok!(retriever.retrieve(&request).await);

    assert_eq!(result.len(), 10);
    for pair in result.candidates.windows(2) {
        assert!(pair[0].rerank_score >= pair[1].rerank_score);
    }
    assert_eq!(result.candidates[0].candidate.document.id, "art-2");
    assert_eq!(result.candidates[9].candidate.document.id, "art-4");
}

#[tokio::test]
async fn test_retrieve_is_idempotent() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(index, &TEN_SCORES);
    let request = retriever.request("What is a secular state?");

    let first = assert_ok!(retriever.retrieve(&request).await);
    let second = assert_ok!(retriever.retrieve(&request).await);

    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.shortlist_len, second.shortlist_len);
}

#[tokio::test]
async fn test_threshold_is_inclusive() {
    let index = Arc::new(seeded_index(3));
    let retriever = table_retriever(index, &[0.4999, 0.5, 0.5001]);

    let result = assert_ok!(retriever.retrieve(&retriever.request("q")).await);

    assert_eq!(ids(&result), vec!["art-3", "art-2"]);
    assert_eq!(result.candidates[1].rerank_score, 0.5);
}

#[tokio::test]
async fn test_ties_keep_vector_order() {
    let index = Arc::new(seeded_index(5));
    let retriever = table_retriever(index, &[0.7, 0.9, 0.7, 0.7, 0.9]);

    let result = assert_ok!(retriever.retrieve(&retriever.request("q")).await);

    assert_eq!(ids(&result), vec!["art-2", "art-5", "art-1", "art-3", "art-4"]);
}

#[tokio::test]
async fn test_empty_index_skips_reranker() {
    let index = Arc::new(MockVectorIndex::new(common::fixtures::DIM));
    let retriever = table_retriever(Arc::clone(&index), &[]);

    let result = assert_ok!(retriever.retrieve(&retriever.request("q")).await);

    assert!(result.is_empty());
    assert_eq!(result.shortlist_len, 0);
    assert_eq!(index.query_count(), 1);
    assert_eq!(retriever.reranker().scorer().calls(), 0);
}

#[tokio::test]
async fn test_all_below_threshold_returns_empty() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(index, &[0.1, 0.2, 0.3, 0.4, 0.49, 0.0, -2.0, 0.45, 0.12, 0.3]);

    let result = assert_ok!(retriever.retrieve(&retriever.request("q")).await);

    assert!(result.is_empty());
    assert_eq!(result.shortlist_len, 10);
}

#[tokio::test]
async fn test_seven_pass_five_returned() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(index, &TEN_SCORES);

    let request = RetrievalRequest::new("q").n_initial(10).n_final(5);
    let result = assert_ok!(retriever.retrieve(&request).await);

    // Scores >= 0.5: art-2 .95, art-9 .9, art-5 .8, art-7 .7, art-3 .6, art-10 .55, art-6 .5
    assert_eq!(result.len(), 5);
    assert_eq!(ids(&result), vec!["art-2", "art-9", "art-5", "art-7", "art-3"]);
}

#[tokio::test]
async fn test_batch_size_does_not_change_result() {
    let mut outputs = Vec::new();
    for batch_size in [1, 2, 4, 10, 32] {
        let retriever = Retriever::new(
            AxisEmbedder::default(),
            seeded_index(10),
            table_reranker(&TEN_SCORES, batch_size),
            test_config(),
        )
        .unwrap();
        let request = RetrievalRequest::new("q").n_final(10).relevance_threshold(0.0);
        outputs.push(retriever.retrieve(&request).await.unwrap().candidates);
    }

    for other in &outputs[1..] {
        assert_eq!(&outputs[0], other);
    }
}

#[tokio::test]
async fn test_embedding_connection_error_is_unavailable() {
    let index = Arc::new(seeded_index(10));
    let retriever = Retriever::new(
        UnreachableEmbedder,
        Arc::clone(&index),
        table_reranker(&TEN_SCORES, 4),
        test_config(),
    )
    .unwrap();

    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(matches!(
        err,
        RetrievalError::Unavailable {
            stage: Stage::Embedding,
            ..
        }
    ));
    assert_eq!(err.kind(), "retrieval_unavailable");
    assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn test_index_failure_is_unavailable() {
    let index = Arc::new(seeded_index(10));
    index.fail_with("connection reset by peer");
    let retriever = table_retriever(Arc::clone(&index), &TEN_SCORES);

    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(matches!(
        err,
        RetrievalError::Unavailable {
            stage: Stage::Index,
            ..
        }
    ));
    assert_eq!(retriever.reranker().scorer().calls(), 0);

    index.recover();
    assert_ok!(retriever.retrieve(&retriever.request("q")).await);
}

#[tokio::test]
async fn test_scoring_failure_is_fatal() {
    let retriever = Retriever::new(
        AxisEmbedder::default(),
        seeded_index(10),
        BatchReranker::new(
            Arc::new(BrokenScorer::new(1)),
            RerankOptions::default()
                .with_batch_size(3)
                .with_max_concurrent_batches(1),
        )
        .unwrap(),
        test_config(),
    )
    .unwrap();

    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(matches!(
        err,
        RetrievalError::RerankFailure(ScoringError::ModelFailed { .. })
    ));
    assert_eq!(err.kind(), "rerank_failure");
}

#[tokio::test]
async fn test_timeout() {
    let retriever = Retriever::new(
        AxisEmbedder::default(),
        seeded_index(10),
        StalledReranker {
            delay: Duration::from_secs(5),
        },
        test_config().with_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(matches!(err, RetrievalError::Timeout { timeout_ms: 50 }));
    assert_eq!(err.kind(), "retrieval_timeout");
}

#[tokio::test]
async fn test_timeout_covers_blocking_embedding() {
    let retriever = Retriever::new(
        InlineSlowEmbedder {
            delay: Duration::from_millis(300),
        },
        MockVectorIndex::new(common::fixtures::DIM),
        table_reranker(&[], 8),
        test_config().with_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(err.is_timeout());
    assert!(matches!(err, RetrievalError::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn test_timeout_fires_while_encoder_runs() {
    let retriever = Retriever::new(
        BlockingPoolEmbedder {
            delay: Duration::from_secs(1),
        },
        seeded_index(10),
        table_reranker(&[], 8),
        test_config().with_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = assert_err!(retriever.retrieve(&retriever.request("q")).await);

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_invalid_requests_rejected_before_backends() {
    let index = Arc::new(seeded_index(3));
    let retriever = table_retriever(Arc::clone(&index), &[1.0; 3]);

    for request in [
        RetrievalRequest::new(""),
        RetrievalRequest::new("  \n"),
        RetrievalRequest::new("q").n_initial(2).n_final(3),
        RetrievalRequest::new("q").relevance_threshold(f32::INFINITY),
    ] {
        let err = assert_err!(retriever.retrieve(&request).await);
        assert!(matches!(err, RetrievalError::InvalidRequest { .. }));
    }

    assert_eq!(retriever.embedder().calls(), 0);
    assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn test_context_for() {
    let index = Arc::new(seeded_index(3));
    let retriever = table_retriever(index, &[0.9, 0.1, 0.7]);

    let context = assert_ok!(retriever.context_for("q").await);

    assert!(context.starts_with("Source 1:\nChapter: Chapter 1."));
    assert!(context.contains(&format!("Text:\n{}\n", article_text(1))));
    assert!(context.contains("Source 2:\n"));
    assert!(context.contains("Article: Article 3\n"));
    assert!(!context.contains("Source 3:"));
}

#[tokio::test]
async fn test_context_for_without_grounding_is_empty() {
    let index = Arc::new(seeded_index(3));
    let retriever = table_retriever(index, &[0.1, 0.1, 0.1]);

    assert_eq!(assert_ok!(retriever.context_for("q").await), "");
}

#[tokio::test]
async fn test_retrieve_many_reports_each_query() {
    let index = Arc::new(seeded_index(10));
    let retriever = table_retriever(index, &TEN_SCORES);

    let results = retriever
        .retrieve_many(["first question", " ", "second question"])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().len(), 5);
    assert!(matches!(results[1], Err(RetrievalError::InvalidRequest { .. })));
    assert_eq!(results[2].as_ref().unwrap().len(), 5);
}

#[tokio::test]
async fn test_check_ready() {
    let index = Arc::new(seeded_index(7));
    let retriever = table_retriever(Arc::clone(&index), &[]);

    assert_eq!(assert_ok!(retriever.check_ready().await), 7);

    index.fail_with("collection not found");
    let err = assert_err!(retriever.check_ready().await);
    assert!(err.is_unavailable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_share_backends() {
    let index = Arc::new(seeded_index(10));
    let retriever = Arc::new(table_retriever(Arc::clone(&index), &TEN_SCORES));
    let expected = retriever.retrieve(&retriever.request("q")).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = Arc::clone(&retriever);
            tokio::spawn(async move { retriever.retrieve(&retriever.request("q")).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.candidates, expected.candidates);
    }
    assert_eq!(index.len(), 10);
}

#[tokio::test]
async fn test_stub_models_end_to_end() {
    let embedder = CachedEmbedder::new(
        DenseEmbedder::load(DenseConfig::stub().with_embedding_dim(64)).unwrap(),
        32,
    );
    let index = MockVectorIndex::new(64);

    let articles = [
        (
            "Article 14",
            "The Russian Federation is a secular state. No religion may be established as a state religion.",
        ),
        (
            "Article 81",
            "The President of the Russian Federation is elected for six years by citizens on the basis of universal equal and direct suffrage by secret ballot.",
        ),
        (
            "Article 9",
            "Land and other natural resources may be in private, state, municipal and other forms of ownership.",
        ),
        (
            "Article 95",
            "The Federal Assembly consists of two chambers: the Federation Council and the State Duma.",
        ),
    ];
    for (i, (article, text)) in articles.iter().enumerate() {
        let embedding = embedder.embed(text).await.unwrap();
        index
            .insert(
                Document::new(
                    i.to_string(),
                    *text,
                    DocumentMetadata::new("Chapter", *article, "Constitution"),
                ),
                embedding,
            )
            .unwrap();
    }

    let reranker = BatchReranker::from_model(
        Reranker::stub().unwrap(),
        RerankOptions::default().with_batch_size(2),
    )
    .unwrap();
    let retriever = Retriever::new(
        embedder,
        index,
        reranker,
        test_config().with_embedding_dim(64),
    )
    .unwrap();

    let result = retriever
        .retrieve(&retriever.request("How is the President elected?"))
        .await
        .unwrap();

    assert_eq!(result.shortlist_len, 4);
    assert_eq!(result.len(), 1);
    assert_eq!(result.candidates[0].metadata().article_number, "Article 81");

    let secular = retriever
        .retrieve(&retriever.request("Is Russia a secular state?"))
        .await
        .unwrap();
    assert_eq!(secular.candidates[0].metadata().article_number, "Article 14");

    let unrelated = retriever
        .retrieve(&retriever.request("quantum chromodynamics"))
        .await
        .unwrap();
    assert!(unrelated.is_empty());
}
