//! Hybrid retrieval system
//!
//! Combines:
//! - Dense vector search through a [`VectorStore`](crate::store::VectorStore)
//! - BM25 lexical search over the dense candidates
//! - Min-max normalization and linear fusion of both signals
//! - Optional cross-encoder reranking

mod analyzer;
mod bm25;
mod cache;
#[cfg(feature = "onnx")]
mod cross_encoder;
mod error;
mod fusion;
mod hybrid;
mod pipeline;
mod rerank_http;
mod reranker;

pub use analyzer::*;
pub use bm25::*;
pub use cache::*;
#[cfg(feature = "onnx")]
pub use cross_encoder::*;
pub use error::*;
pub use fusion::*;
pub use hybrid::*;
pub use pipeline::*;
pub use rerank_http::*;
pub use reranker::*;
