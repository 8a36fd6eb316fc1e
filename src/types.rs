//! Core types shared by chunking, retrieval and the collaborator adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a document
pub type DocumentId = String;

/// Unique identifier for a chunk (`"{doc_id}_{index}"`)
pub type ChunkId = String;

/// Identifier of a vector-store collection
pub type CollectionId = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Ordered scalar metadata attached to chunks and hits
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Build the stable chunk identifier for a chunk of a document
pub fn chunk_id_for(doc_id: &str, index: usize) -> ChunkId {
    format!("{}_{}", doc_id, index)
}

/// A raw document handed to the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier (generated when absent)
    pub id: DocumentId,
    /// Name of the file the text came from
    pub filename: String,
    /// Extracted plain text
    pub content: String,
    /// User metadata copied onto every chunk
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a fresh random id
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Set an explicit document id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded contiguous passage of a source document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocumentId,
    /// Position of the chunk within its document, from 0
    pub index: usize,
    pub content: String,
    pub source_filename: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One result row returned by a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub chunk_id: ChunkId,
    pub content: String,
    /// Similarity score as reported by the store
    pub score: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A point written to a vector store at ingestion time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub chunk: Chunk,
    pub vector: Embedding,
}

/// A candidate passage with its fused and per-signal scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub chunk_id: ChunkId,
    pub content: String,
    /// Value used for ordering
    pub score: f64,
    /// Normalized semantic score (raw store score when hybrid is off)
    pub vector_score: f64,
    /// Normalized lexical score, 0 when the chunk had no keyword hit
    pub lexical_score: f64,
    /// Cross-encoder relevance, set by the reranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ScoredCandidate {
    /// Candidate carrying a raw vector hit through unchanged
    pub fn from_vector_hit(hit: VectorHit) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            content: hit.content,
            score: hit.score,
            vector_score: hit.score,
            lexical_score: 0.0,
            rerank_score: None,
            metadata: hit.metadata,
        }
    }

    /// Filename the chunk was ingested from, if the store kept it
    pub fn source_filename(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(|v| v.as_str())
    }
}

/// Pipeline stage a failure or degradation is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    VectorSearch,
    LexicalIndex,
    Rerank,
    Ingestion,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::VectorSearch => "vector_search",
            Self::LexicalIndex => "lexical_index",
            Self::Rerank => "rerank",
            Self::Ingestion => "ingestion",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker attached to a result produced in a degraded mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    pub reason: String,
}

/// Ranked output of the fusion engine or the full pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Descending by `score` (or `rerank_score` after reranking)
    pub candidates: Vec<ScoredCandidate>,
    /// Set when one or more stages fell back to a degraded mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl FusionResult {
    pub fn new(candidates: Vec<ScoredCandidate>) -> Self {
        Self {
            candidates,
            degradations: Vec::new(),
        }
    }

    pub fn degraded(mut self, stage: Stage, reason: impl Into<String>) -> Self {
        self.degradations.push(Degradation {
            stage,
            reason: reason.into(),
        });
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn chunk_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.chunk_id.as_str()).collect()
    }
}

/// A search request against one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub collection: CollectionId,
    pub top_k: usize,
    /// Drop candidates whose final score is below this value
    #[serde(default)]
    pub score_threshold: Option<f64>,
    #[serde(default = "default_true")]
    pub use_hybrid: bool,
    /// Precomputed query embedding; the engine embeds the query when absent
    #[serde(default, skip_serializing)]
    pub query_vector: Option<Embedding>,
}

fn default_true() -> bool {
    true
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, collection: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            collection: collection.into(),
            top_k,
            score_threshold: None,
            use_hybrid: true,
            query_vector: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_hybrid(mut self, use_hybrid: bool) -> Self {
        self.use_hybrid = use_hybrid;
        self
    }

    pub fn with_query_vector(mut self, vector: Embedding) -> Self {
        self.query_vector = Some(vector);
        self
    }
}

/// Summary of one ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub doc_id: DocumentId,
    pub filename: String,
    pub collection: CollectionId,
    pub chunks_count: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Chunk metadata key holding the RFC 3339 ingestion time
pub const INGESTED_AT_KEY: &str = "ingested_at";

/// A stored document as seen through its chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: DocumentId,
    pub filename: String,
    pub chunks_count: usize,
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of a document listing; `page` counts from 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub documents: Vec<DocumentSummary>,
}
