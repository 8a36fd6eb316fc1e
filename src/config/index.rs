//! Chunking and retrieval configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Separators tried from coarsest to finest when splitting text
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", ". ", "! ", "? ", " ", "",
];

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in tokens
    pub chunk_size: usize,
    /// Tokens of the previous chunk repeated at the start of the next one
    pub chunk_overlap: usize,
    /// Split points, coarse to fine; `""` means "anywhere"
    pub separators: Vec<String>,
    /// Optional Hugging Face `tokenizer.json` used for counting tokens
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            tokenizer_path: None,
        }
    }
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Weight of the semantic signal in the fused score (0.0-1.0)
    pub hybrid_alpha: f64,
    /// Result count when a request does not specify one
    pub default_top_k: usize,
    /// Largest accepted `top_k`
    pub max_top_k: usize,
    /// Vector candidates fetched per requested result in hybrid mode
    pub candidate_multiplier: usize,
    /// Upper bound on a single vector-store or embedding call
    pub collaborator_timeout_ms: u64,
    /// Lexical indexes kept per (collection, candidate set); 0 disables caching
    pub lexical_cache_capacity: usize,
    /// Collection used when none is given
    pub default_collection: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid_alpha: 0.7,
            default_top_k: 10,
            max_top_k: 100,
            candidate_multiplier: 2,
            collaborator_timeout_ms: 10_000,
            lexical_cache_capacity: 64,
            default_collection: "default".to_string(),
        }
    }
}
