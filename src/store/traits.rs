//! Vector store trait definitions

use crate::types::{Chunk, DocumentPage, DocumentSummary, VectorHit, VectorPoint, INGESTED_AT_KEY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Debug;

/// Errors that can occur talking to a vector store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Vector length does not match the collection
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The store answered with an error
    #[error("Store request failed: {0}")]
    RequestFailed(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Snapshot read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or payload (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for vector store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Similarity search and storage of chunk embeddings
///
/// Implementations are shared as `Arc<dyn VectorStore>` across requests.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Nearest chunks to `query_vector`, best first, at most `top_k`.
    ///
    /// With a threshold, hits scoring below it are omitted.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: Option<f64>,
    ) -> StoreResult<Vec<VectorHit>>;

    /// Insert or replace points keyed by chunk_id; returns the number written
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> StoreResult<usize>;

    /// Remove every chunk of a document; returns the number removed
    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<usize>;

    /// Number of points in a collection (0 when it does not exist)
    async fn count(&self, collection: &str) -> StoreResult<usize>;

    /// Stored chunks ordered by document then chunk index, restricted to one
    /// document when `doc_id` is given. Empty when the collection does not exist.
    async fn document_chunks(&self, collection: &str, doc_id: Option<&str>) -> StoreResult<Vec<Chunk>>;

    /// Page through the documents of a collection, newest first
    async fn list_documents(&self, collection: &str, page: usize, page_size: usize) -> StoreResult<DocumentPage> {
        let chunks = self.document_chunks(collection, None).await?;
        Ok(paginate(summarize_documents(&chunks), page, page_size))
    }

    /// Backend name (e.g., "memory", "qdrant")
    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors; 0 when either is all zeros
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Ensure a vector has the dimension a collection expects
pub fn check_dimensions(expected: usize, actual: usize) -> StoreResult<()> {
    if actual != expected {
        return Err(StoreError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Group chunks into one summary per document, newest first, ties by doc_id
pub fn summarize_documents(chunks: &[Chunk]) -> Vec<DocumentSummary> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut documents: Vec<DocumentSummary> = Vec::new();

    for chunk in chunks {
        let created_at = chunk
            .metadata
            .get(INGESTED_AT_KEY)
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        match positions.get(chunk.doc_id.as_str()) {
            Some(&i) => {
                let doc = &mut documents[i];
                doc.chunks_count += 1;
                doc.created_at = doc.created_at.max(created_at);
            }
            None => {
                positions.insert(&chunk.doc_id, documents.len());
                documents.push(DocumentSummary {
                    doc_id: chunk.doc_id.clone(),
                    filename: chunk.source_filename.clone(),
                    chunks_count: 1,
                    created_at,
                });
            }
        }
    }

    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.doc_id.cmp(&b.doc_id)));
    documents
}

/// Slice out page `page` (from 1; 0 is treated as 1)
pub fn paginate(documents: Vec<DocumentSummary>, page: usize, page_size: usize) -> DocumentPage {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = documents.len();
    let documents = documents
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();
    DocumentPage {
        total,
        page,
        page_size,
        documents,
    }
}
