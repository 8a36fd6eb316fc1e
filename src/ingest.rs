//! Document ingestion
//!
//! Chunks a document, embeds the chunks in batches and writes them to the
//! vector store, replacing any chunks previously stored for the same document
//! once the new chunks are fully embedded.

use crate::chunking::TextSplitter;
use crate::embedding::{EmbeddingBackend, EmbeddingError};
use crate::store::{StoreError, VectorStore};
use crate::types::{Document, IngestReport, VectorPoint, INGESTED_AT_KEY};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default number of chunks embedded per request
pub const DEFAULT_INGEST_BATCH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Document '{0}' has no content to index")]
    EmptyDocument(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Embedding backend returned {actual} vectors for {expected} chunks")]
    CountMismatch { expected: usize, actual: usize },
}

/// Write path: chunk, embed, upsert
pub struct Ingestor {
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            splitter,
            embedder,
            store,
            batch_size: DEFAULT_INGEST_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Index a document into `collection`
    pub async fn ingest(&self, collection: &str, document: Document) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let ingested_at = Utc::now();
        let mut chunks = self.splitter.split_document(&document);
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument(document.filename));
        }
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert(INGESTED_AT_KEY.to_string(), ingested_at.to_rfc3339().into());
        }

        let chunks_count = chunks.len();
        let mut points = Vec::with_capacity(chunks_count);
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IngestError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            points.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| VectorPoint { chunk, vector }),
            );
        }

        // Old chunks stay in place until every new chunk has a vector
        let replaced = self.store.delete_document(collection, &document.id).await?;
        if replaced > 0 {
            debug!("Replacing {} existing chunks of {}", replaced, document.id);
        }
        self.store.upsert(collection, points).await?;

        info!(
            "Ingested {} ({} chunks) into '{}' in {:?}",
            document.filename,
            chunks_count,
            collection,
            start.elapsed()
        );

        Ok(IngestReport {
            doc_id: document.id,
            filename: document.filename,
            collection: collection.to_string(),
            chunks_count,
            ingested_at,
        })
    }

    /// Remove every chunk of a document; returns the number removed
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<usize, IngestError> {
        let removed = self.store.delete_document(collection, doc_id).await?;
        info!("Deleted {} chunks of {} from '{}'", removed, doc_id, collection);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::embedding::{EmbeddingResult, HashedBackend};
    use crate::store::MemoryVectorStore;
    use crate::types::Embedding;
    use async_trait::async_trait;

    fn small_splitter() -> TextSplitter {
        TextSplitter::new(ChunkingConfig {
            chunk_size: 8,
            chunk_overlap: 0,
            ..Default::default()
        })
    }

    fn ingestor(store: Arc<MemoryVectorStore>) -> Ingestor {
        Ingestor::new(small_splitter(), Arc::new(HashedBackend::new(32).unwrap()), store)
    }

    const TEXT: &str = "Rust has ownership. Borrowing is checked at compile time.\n\n\
                        Lifetimes name the scopes of references. Traits describe shared behavior.";

    #[tokio::test]
    async fn test_ingest_writes_every_chunk() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone()).with_batch_size(2);

        let doc = Document::new("rust.md", TEXT).with_id("rust");
        let report = ingestor.ingest("docs", doc).await.unwrap();

        assert_eq!(report.doc_id, "rust");
        assert_eq!(report.collection, "docs");
        assert!(report.chunks_count > 1);
        assert_eq!(store.count("docs").await.unwrap(), report.chunks_count);
    }

    #[tokio::test]
    async fn test_reingest_replaces_previous_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());

        ingestor
            .ingest("docs", Document::new("rust.md", TEXT).with_id("rust"))
            .await
            .unwrap();
        let report = ingestor
            .ingest("docs", Document::new("rust.md", "Short now.").with_id("rust"))
            .await
            .unwrap();

        assert_eq!(report.chunks_count, 1);
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingested_document_is_listed() {
        let store = Arc::new(MemoryVectorStore::new());
        let report = ingestor(store.clone())
            .ingest("docs", Document::new("rust.md", TEXT).with_id("rust"))
            .await
            .unwrap();

        let page = store.list_documents("docs", 1, 20).await.unwrap();
        assert_eq!(page.total, 1);
        let doc = &page.documents[0];
        assert_eq!(doc.doc_id, "rust");
        assert_eq!(doc.filename, "rust.md");
        assert_eq!(doc.chunks_count, report.chunks_count);
        assert_eq!(
            doc.created_at.map(|t| t.timestamp_micros()),
            Some(report.ingested_at.timestamp_micros())
        );
    }

    #[tokio::test]
    async fn test_empty_document_rejected() {
        let store = Arc::new(MemoryVectorStore::new());
        let err = ingestor(store)
            .ingest("docs", Document::new("blank.txt", "  \n\n "))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyDocument(name) if name == "blank.txt"));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        let report = ingestor
            .ingest("docs", Document::new("rust.md", TEXT).with_id("rust"))
            .await
            .unwrap();

        assert_eq!(ingestor.delete_document("docs", "rust").await.unwrap(), report.chunks_count);
        assert_eq!(store.count("docs").await.unwrap(), 0);
        assert_eq!(ingestor.delete_document("docs", "rust").await.unwrap(), 0);
    }

    #[derive(Debug)]
    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingBackend for ShortEmbedder {
        async fn embed(&self, _text: &str) -> EmbeddingResult<Embedding> {
            Ok(vec![1.0])
        }

        async fn embed_batch(&self, _texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
            Ok(vec![vec![1.0]])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[derive(Debug)]
    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingBackend for FailingEmbedder {
        async fn embed(&self, _text: &str) -> EmbeddingResult<Embedding> {
            Err(EmbeddingError::EmbeddingFailed("backend down".to_string()))
        }

        fn dimensions(&self) -> usize {
            32
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let report = ingestor(store.clone())
            .ingest("docs", Document::new("rust.md", TEXT).with_id("rust"))
            .await
            .unwrap();

        let failing = Ingestor::new(small_splitter(), Arc::new(FailingEmbedder), store.clone());
        let err = failing
            .ingest("docs", Document::new("rust.md", "Rewritten text.").with_id("rust"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Embedding(_)));
        assert_eq!(store.count("docs").await.unwrap(), report.chunks_count);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = Ingestor::new(small_splitter(), Arc::new(ShortEmbedder), store);
        let err = ingestor
            .ingest("docs", Document::new("rust.md", TEXT))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::CountMismatch { .. }));
    }
}
