//! Reranking configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_rerank_timeout() -> u64 {
    15
}

fn default_max_length() -> usize {
    512
}

/// Rerank provider selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RerankBackendConfig {
    /// Remote `/rerank` endpoint (Jina, Cohere, text-embeddings-inference)
    Http {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        model: String,
        #[serde(default = "default_rerank_timeout")]
        timeout_secs: u64,
    },

    /// Query-term overlap heuristic, no model required
    Overlap,

    /// Local cross-encoder exported to ONNX (requires the `onnx` feature)
    Onnx {
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        #[serde(default = "default_max_length")]
        max_length: usize,
    },
}

/// Reranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Enable the rerank stage
    pub use_rerank: bool,
    /// Results kept after reranking when a request does not specify a count
    pub rerank_top_k: usize,
    /// Cross-encoder model name, informational for HTTP providers
    pub rerank_model: String,
    /// Provider; reranking is disabled when absent
    pub provider: Option<RerankBackendConfig>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            use_rerank: true,
            rerank_top_k: 3,
            rerank_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            provider: Some(RerankBackendConfig::Overlap),
        }
    }
}
