//! Hybrid search followed by optional reranking

use super::error::RetrievalResult;
use super::hybrid::HybridSearchEngine;
use super::reranker::Reranker;
use crate::types::{FusionResult, SearchRequest};
use tracing::debug;

/// End-to-end retrieval for one query
pub struct RetrievalPipeline {
    engine: HybridSearchEngine,
    reranker: Reranker,
}

impl RetrievalPipeline {
    pub fn new(engine: HybridSearchEngine, reranker: Reranker) -> Self {
        Self { engine, reranker }
    }

    pub fn engine(&self) -> &HybridSearchEngine {
        &self.engine
    }

    pub fn reranker(&self) -> &Reranker {
        &self.reranker
    }

    /// Search and, when `rerank` is set and a model is loaded, rerank.
    ///
    /// Reranking fetches twice the requested results from the engine and
    /// keeps the best `top_k` by model score. Degradations from both stages
    /// are reported together.
    pub async fn retrieve(&self, request: &SearchRequest, rerank: bool) -> RetrievalResult<FusionResult> {
        self.engine.validate(request)?;

        if !(rerank && self.reranker.is_enabled()) {
            return self.engine.execute(request, request.top_k).await;
        }

        let fetch_k = request.top_k.saturating_mul(2);
        let fused = self.engine.execute(request, fetch_k).await?;
        debug!("Reranking {} fused candidates down to {}", fused.len(), request.top_k);

        let mut reranked = self
            .reranker
            .rerank(&request.query, fused.candidates, Some(request.top_k))
            .await;

        let mut degradations = fused.degradations;
        degradations.append(&mut reranked.degradations);
        reranked.degradations = degradations;
        Ok(reranked)
    }
}
