//! ragcore: hybrid retrieval for retrieval-augmented generation
//!
//! The retrieval core of a RAG system, featuring:
//! - Recursive, token-budgeted chunking with overlap
//! - Per-query BM25 over the dense candidate set
//! - Min-max normalization and linear fusion of semantic and lexical scores
//! - Optional cross-encoder reranking with graceful degradation
//! - Pluggable embedding backends and vector stores (memory, Qdrant)

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod ingest;
pub mod logging;
pub mod retrieval;
pub mod store;
pub mod types;
pub mod util;

pub use config::Config;
pub use types::*;
