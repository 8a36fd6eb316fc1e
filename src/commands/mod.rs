//! CLI subcommands

mod chunk;
mod delete;
mod ingest;
mod init;
mod list;
mod search;

pub use chunk::chunk_file;
pub use delete::delete_document;
pub use ingest::ingest_path;
pub use init::init_config;
pub use list::{list, ListOptions};
pub use search::{search, OutputFormat, SearchOptions};

use anyhow::{Context, Result};
use ragcore::{
    chunking::TextSplitter,
    config::Config,
    embedding::create_backend,
    ingest::Ingestor,
    retrieval::{HybridSearchEngine, LexicalIndexCache, Reranker, RetrievalPipeline},
    store::create_store,
};
use std::sync::Arc;
use std::time::Duration;

/// Collection named on the command line, or the configured default
fn collection_or_default(config: &Config, collection: Option<String>) -> String {
    collection.unwrap_or_else(|| config.retrieval.default_collection.clone())
}

fn build_ingestor(config: &Config) -> Result<Ingestor> {
    let splitter = TextSplitter::from_config(config.chunking.clone())?;
    let embedder = create_backend(&config.embedding).context("Failed to create embedding backend")?;
    let store = create_store(&config.store).context("Failed to open vector store")?;
    Ok(Ingestor::new(splitter, embedder, store))
}

async fn build_pipeline(config: &Config) -> Result<RetrievalPipeline> {
    let embedder = create_backend(&config.embedding).context("Failed to create embedding backend")?;
    let store = create_store(&config.store).context("Failed to open vector store")?;

    let mut engine = HybridSearchEngine::new(store, config.retrieval.clone()).with_embedder(embedder);
    if let Some(cache) = LexicalIndexCache::with_capacity(config.retrieval.lexical_cache_capacity) {
        engine = engine.with_cache(Arc::new(cache));
    }

    let timeout = Duration::from_millis(config.retrieval.collaborator_timeout_ms);
    let reranker = Reranker::from_config(&config.rerank, timeout).await;
    Ok(RetrievalPipeline::new(engine, reranker))
}
