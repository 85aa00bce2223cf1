//! Lexis retrieval CLI entrypoint.
//!
//! `lexis [--json] <question>` prints the grounding context for a question;
//! `lexis --health-check` exits 0 when the article collection is reachable.

use mimalloc::MiMalloc;

use lexis::config::Config;
use lexis::embedding::{CachedEmbedder, DenseEmbedder, Reranker};
use lexis::retrieval::{Retriever, format_context, sources};
use lexis::scoring::BatchReranker;
use lexis::vectordb::QdrantClient;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: lexis [--json] <question>\n       lexis --health-check";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let json = args.iter().any(|arg| arg == "--json");
    let question = args
        .iter()
        .filter(|arg| !arg.starts_with("--"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    if question.trim().is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        qdrant_url = %config.qdrant_url,
        collection = %config.collection,
        "Lexis starting"
    );

    if config.embedder_path.is_none() {
        tracing::warn!("No LEXIS_EMBEDDER_PATH configured, running embedder in stub mode");
    }
    let embedder = DenseEmbedder::load(config.dense_config())?;
    let embedder = CachedEmbedder::new(embedder, config.embed_cache_capacity);

    let index = QdrantClient::new(&config.qdrant_url, &config.collection)?;

    let reranker = BatchReranker::from_model(
        Reranker::load(config.reranker_config())?,
        config.rerank_options(),
    )?;

    let retriever = Retriever::new(embedder, index, reranker, config.retrieval_config())?;

    let documents = retriever.check_ready().await?;
    if documents == 0 {
        tracing::warn!(collection = %config.collection, "Collection is empty");
    }

    let result = retriever.retrieve(&retriever.request(question)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sources(&result))?);
    } else if result.is_empty() {
        println!("No sufficiently relevant articles found.");
    } else {
        println!("{}", format_context(&result));
    }

    Ok(())
}

async fn run_health_check() -> i32 {
    let Ok(config) = Config::from_env() else {
        return 1;
    };
    let Ok(client) = QdrantClient::new(&config.qdrant_url, &config.collection) else {
        return 1;
    };

    match tokio::time::timeout(config.timeout(), client.document_count()).await {
        Ok(Ok(_)) => 0,
        Ok(Err(e)) => {
            eprintln!("{} ({}): {}", client.url(), client.collection(), e);
            1
        }
        Err(_) => {
            eprintln!("{} ({}): timed out", client.url(), client.collection());
            1
        }
    }
}
