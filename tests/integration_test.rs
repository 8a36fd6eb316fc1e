//! Integration tests for ragcore
//!
//! These tests verify end-to-end functionality through the public API.

use async_trait::async_trait;
use ragcore::{
    chunking::{SimpleTokenizer, TextSplitter, TokenCounter},
    config::{ChunkingConfig, Config, RetrievalConfig},
    embedding::{create_backend, HashedBackend},
    ingest::Ingestor,
    retrieval::{normalize, HybridSearchEngine, LexicalIndexCache, Reranker, RetrievalPipeline},
    store::{create_store, MemoryVectorStore, StoreResult, VectorStore},
    types::{Chunk, Document, Metadata, SearchRequest, VectorHit, VectorPoint},
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const RUST_DOC: &str = "Rust guarantees memory safety through ownership.\n\n\
    Every value has a single owner. Borrowing lets code use a value without taking ownership. \
    The borrow checker enforces these rules at compile time.\n\n\
    Lifetimes describe how long references stay valid.";

const BREAD_DOC: &str = "Sourdough bread relies on a wild yeast starter.\n\n\
    Feed the starter with flour and water, then mix the dough and let it rise overnight. \
    Bake the bread in a hot dutch oven for a crisp crust.";

const ML_DOC: &str = "Machine learning models learn patterns from data.\n\n\
    Supervised learning uses labeled examples. Neural networks stack layers of weighted sums. \
    Gradient descent adjusts the weights to reduce the loss.";

fn splitter() -> TextSplitter {
    TextSplitter::new(ChunkingConfig {
        chunk_size: 24,
        chunk_overlap: 4,
        ..Default::default()
    })
}

async fn ingest_corpus(store: Arc<dyn VectorStore>) {
    let ingestor = Ingestor::new(splitter(), Arc::new(HashedBackend::new(256).unwrap()), store);
    for (id, name, text) in [
        ("rust", "rust.md", RUST_DOC),
        ("bread", "bread.md", BREAD_DOC),
        ("ml", "ml.md", ML_DOC),
    ] {
        let report = ingestor
            .ingest("kb", Document::new(name, text).with_id(id))
            .await
            .unwrap();
        assert!(report.chunks_count >= 1);
    }
}

fn engine(store: Arc<dyn VectorStore>) -> HybridSearchEngine {
    HybridSearchEngine::new(store, RetrievalConfig::default())
        .with_embedder(Arc::new(HashedBackend::new(256).unwrap()))
}

/// Test the complete ingestion and retrieval pipeline
#[tokio::test]
async fn test_ingest_and_search_pipeline() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    ingest_corpus(store.clone()).await;

    let engine = engine(store);
    let result = engine
        .hybrid_search("sourdough bread starter", "kb", 3, None, true)
        .await
        .unwrap();

    assert!(!result.is_empty());
    assert!(!result.is_degraded());
    let top = &result.candidates[0];
    assert!(top.chunk_id.starts_with("bread_"));
    assert_eq!(top.source_filename(), Some("bread.md"));
    assert_eq!(top.metadata["doc_id"], "bread");

    for c in &result.candidates {
        assert!((c.score - (0.7 * c.vector_score + 0.3 * c.lexical_score)).abs() < 1e-9);
    }
    assert!(result.candidates.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryVectorStore::open(temp_dir.path()).unwrap());
    ingest_corpus(store.clone()).await;
    let count = store.count("kb").await.unwrap();

    let before = engine(store)
        .hybrid_search("borrow checker", "kb", 2, None, true)
        .await
        .unwrap();

    let reopened = Arc::new(MemoryVectorStore::open(temp_dir.path()).unwrap());
    assert_eq!(reopened.count("kb").await.unwrap(), count);
    let after = engine(reopened)
        .hybrid_search("borrow checker", "kb", 2, None, true)
        .await
        .unwrap();

    assert_eq!(before, after);
    assert!(after.candidates[0].chunk_id.starts_with("rust_"));
}

#[tokio::test]
async fn test_identical_queries_are_deterministic() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    ingest_corpus(store.clone()).await;
    let engine = engine(store).with_cache(Arc::new(LexicalIndexCache::with_capacity(8).unwrap()));

    let request = SearchRequest::new("neural networks learn weights", "kb", 4);
    let first = engine.search(&request).await.unwrap();
    let second = engine.search(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_deleted_document_disappears_from_results() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    ingest_corpus(store.clone()).await;

    let ingestor = Ingestor::new(splitter(), Arc::new(HashedBackend::new(256).unwrap()), store.clone());
    assert!(ingestor.delete_document("kb", "bread").await.unwrap() > 0);

    let result = engine(store)
        .hybrid_search("sourdough bread starter", "kb", 10, None, true)
        .await
        .unwrap();
    assert!(result.candidates.iter().all(|c| !c.chunk_id.starts_with("bread_")));
}

#[tokio::test]
async fn test_list_documents_and_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryVectorStore::open(temp_dir.path()).unwrap());
    ingest_corpus(store.clone()).await;

    let reopened = MemoryVectorStore::open(temp_dir.path()).unwrap();
    let page = reopened.list_documents("kb", 1, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.documents.len(), 2);
    assert!(page.documents.iter().all(|d| d.created_at.is_some()));

    let chunks = reopened.document_chunks("kb", Some("bread")).await.unwrap();
    assert!(!chunks.is_empty());
    assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i && c.doc_id == "bread"));
    assert_eq!(chunks[0].source_filename, "bread.md");

    let all: usize = reopened
        .list_documents("kb", 1, 10)
        .await
        .unwrap()
        .documents
        .iter()
        .map(|d| d.chunks_count)
        .sum();
    assert_eq!(all, reopened.count("kb").await.unwrap());
}

#[tokio::test]
async fn test_unknown_collection_is_empty() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let result = engine(store)
        .hybrid_search("anything", "missing", 5, None, true)
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_disabled_reranker_keeps_fused_prefix() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    ingest_corpus(store.clone()).await;

    let request = SearchRequest::new("learning from data", "kb", 3);
    let fused = engine(store.clone()).search(&request).await.unwrap();

    let pipeline = RetrievalPipeline::new(engine(store), Reranker::disabled(3));
    let result = pipeline.retrieve(&request, true).await.unwrap();

    assert_eq!(result, fused);
    assert!(result.candidates.iter().all(|c| c.rerank_score.is_none()));
}

#[tokio::test]
async fn test_pipeline_from_config() {
    let config = Config::from_toml(
        r#"
[chunking]
chunk_size = 32
chunk_overlap = 4

[retrieval]
hybrid_alpha = 0.5

[rerank]
use_rerank = true
rerank_top_k = 2

[rerank.provider]
backend = "overlap"

[embedding]
backend = "hashed"
dimensions = 128

[store]
backend = "memory"
"#,
    )
    .unwrap();

    let store = create_store(&config.store).unwrap();
    let embedder = create_backend(&config.embedding).unwrap();
    let ingestor = Ingestor::new(
        TextSplitter::from_config(config.chunking.clone()).unwrap(),
        embedder.clone(),
        store.clone(),
    );
    ingestor
        .ingest("default", Document::new("ml.md", ML_DOC).with_id("ml"))
        .await
        .unwrap();
    ingestor
        .ingest("default", Document::new("rust.md", RUST_DOC).with_id("rust"))
        .await
        .unwrap();

    let engine = HybridSearchEngine::new(store, config.retrieval.clone()).with_embedder(embedder);
    let reranker = Reranker::from_config(&config.rerank, Duration::from_secs(5)).await;
    assert!(reranker.is_enabled());
    let pipeline = RetrievalPipeline::new(engine, reranker);

    let request = SearchRequest::new("gradient descent weights", "default", 2);
    let result = pipeline.retrieve(&request, true).await.unwrap();

    assert!(result.len() <= 2);
    assert!(result.candidates[0].chunk_id.starts_with("ml_"));
    assert!(result.candidates.iter().all(|c| c.rerank_score.is_some()));
    for c in &result.candidates {
        assert!((c.score - (0.5 * c.vector_score + 0.5 * c.lexical_score)).abs() < 1e-9);
    }
}

/// Store returning fixed hits in a fixed order
#[derive(Debug)]
struct FixedStore(Vec<VectorHit>);

#[async_trait]
impl VectorStore for FixedStore {
    async fn search(
        &self,
        _collection: &str,
        _query_vector: &[f32],
        top_k: usize,
        _score_threshold: Option<f64>,
    ) -> StoreResult<Vec<VectorHit>> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, _collection: &str, points: Vec<VectorPoint>) -> StoreResult<usize> {
        Ok(points.len())
    }

    async fn delete_document(&self, _collection: &str, _doc_id: &str) -> StoreResult<usize> {
        Ok(0)
    }

    async fn count(&self, _collection: &str) -> StoreResult<usize> {
        Ok(self.0.len())
    }

    async fn document_chunks(&self, _collection: &str, _doc_id: Option<&str>) -> StoreResult<Vec<Chunk>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn hit(chunk_id: &str, content: &str, score: f64) -> VectorHit {
    VectorHit {
        chunk_id: chunk_id.to_string(),
        content: content.to_string(),
        score,
        metadata: Metadata::new(),
    }
}

#[tokio::test]
async fn test_phrase_match_wins_over_equal_vectors() {
    let store = Arc::new(FixedStore(vec![
        hit("chunk2", "Convolutional networks for image recognition", 0.8),
        hit("chunk1", "A gentle introduction to machine learning", 0.8),
    ]));
    let engine = HybridSearchEngine::new(store, RetrievalConfig::default());

    let request = SearchRequest::new("machine learning", "kb", 2).with_query_vector(vec![0.0; 4]);
    let result = engine.search(&request).await.unwrap();

    assert_eq!(result.chunk_ids(), vec!["chunk1", "chunk2"]);
}

#[tokio::test]
async fn test_high_threshold_yields_empty_result() {
    let store = Arc::new(FixedStore(vec![
        hit("a", "first passage", 0.62),
        hit("b", "second passage", 0.55),
    ]));
    let engine = HybridSearchEngine::new(store, RetrievalConfig::default());

    let request = SearchRequest::new("unrelated words", "kb", 2)
        .with_threshold(0.9)
        .with_query_vector(vec![0.0; 4]);
    let result = engine.search(&request).await.unwrap();

    assert!(result.is_empty());
    assert!(!result.is_degraded());
}

#[test]
fn test_chunks_reconstruct_source() {
    let text = [RUST_DOC, BREAD_DOC, ML_DOC].join("\n\n");
    let splitter = splitter();
    let spans = splitter.split_with_spans(&text);

    assert!(spans.len() > 1);
    assert_eq!(spans[0].start, spans[0].body_start);

    let rebuilt: String = spans.iter().map(|s| s.body(&text)).collect();
    assert_eq!(rebuilt, text);

    let counter = SimpleTokenizer;
    for span in &spans {
        assert!(counter.count(span.text(&text)) <= 24);
    }

    let chunks = splitter.split_document(&Document::new("all.md", text.clone()).with_id("all"));
    let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids[0], "all_0");
    assert_eq!(chunks.len(), spans.len());
}

#[test]
fn test_short_text_is_single_chunk() {
    let chunks = splitter().split_text("Just one short sentence.");
    assert_eq!(chunks, vec!["Just one short sentence.".to_string()]);
    assert!(splitter().split_text("   \n\n  ").is_empty());
}

#[test]
fn test_normalize_properties() {
    assert_eq!(normalize(&[5.0]), vec![1.0]);
    assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![1.0, 1.0, 1.0]);
    assert!(normalize(&[]).is_empty());
    let scaled = normalize(&[2.0, 10.0, 6.0]);
    assert_eq!(scaled, vec![0.0, 1.0, 0.5]);
}
