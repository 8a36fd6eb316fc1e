//! Hybrid retrieval combining dense and lexical search

use super::{
    analyzer::{TextAnalyzer, UnicodeAnalyzer},
    bm25::{LexicalDocument, LexicalError, LexicalIndex},
    cache::LexicalIndexCache,
    error::{RetrievalError, RetrievalResult},
    fusion::{apply_threshold, dedup_by_chunk_id, linear_combination, vector_only, LexicalMatch},
};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingBackend;
use crate::store::VectorStore;
use crate::types::{Embedding, FusionResult, ScoredCandidate, SearchRequest, Stage, VectorHit};
use crate::util::truncate_str;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Hybrid retrieval engine
///
/// Queries the vector store for a candidate set, builds a BM25 index over
/// exactly those candidates, and ranks them by a linear combination of the
/// normalized semantic and lexical scores.
pub struct HybridSearchEngine {
    /// Vector store for dense search
    store: Arc<dyn VectorStore>,
    /// Embedding backend for query encoding
    embedder: Option<Arc<dyn EmbeddingBackend>>,
    /// Analyzer shared by lexical documents and queries
    analyzer: Arc<dyn TextAnalyzer>,
    /// Reuse of lexical indexes across identical candidate sets
    cache: Option<Arc<LexicalIndexCache>>,
    /// Configuration
    config: RetrievalConfig,
}

impl HybridSearchEngine {
    /// Create an engine without an embedder; requests must carry a query vector
    pub fn new(store: Arc<dyn VectorStore>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder: None,
            analyzer: Arc::new(UnicodeAnalyzer),
            cache: None,
            config,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn TextAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<LexicalIndexCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<LexicalIndexCache>> {
        self.cache.as_ref()
    }

    /// Reject requests that must never reach a collaborator
    pub fn validate(&self, request: &SearchRequest) -> RetrievalResult<()> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("query must not be empty".to_string()));
        }
        if request.collection.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("collection must not be empty".to_string()));
        }
        if request.top_k == 0 || request.top_k > self.config.max_top_k {
            return Err(RetrievalError::InvalidInput(format!(
                "top_k must be between 1 and {}, got {}",
                self.config.max_top_k, request.top_k
            )));
        }
        if let Some(threshold) = request.score_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(RetrievalError::InvalidInput(format!(
                    "score_threshold must be within [0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }

    /// Search one collection
    pub async fn search(&self, request: &SearchRequest) -> RetrievalResult<FusionResult> {
        self.validate(request)?;
        self.execute(request, request.top_k).await
    }

    /// Convenience wrapper around [`search`](Self::search)
    pub async fn hybrid_search(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        score_threshold: Option<f64>,
        use_hybrid: bool,
    ) -> RetrievalResult<FusionResult> {
        let mut request = SearchRequest::new(query, collection, top_k).with_hybrid(use_hybrid);
        request.score_threshold = score_threshold;
        self.search(&request).await
    }

    /// Run an already validated request for `top_k` results
    pub(crate) async fn execute(
        &self,
        request: &SearchRequest,
        top_k: usize,
    ) -> RetrievalResult<FusionResult> {
        let start = Instant::now();

        let query_vector = match &request.query_vector {
            Some(vector) => vector.clone(),
            None => self.embed_query(&request.query).await?,
        };

        let result = if request.use_hybrid {
            self.hybrid(request, &query_vector, top_k).await?
        } else {
            self.vector(request, &query_vector, top_k).await?
        };

        info!(
            "Search '{}' in '{}': {} results (hybrid={}, degraded={}) in {:?}",
            truncate_str(&request.query, 50),
            request.collection,
            result.len(),
            request.use_hybrid,
            result.is_degraded(),
            start.elapsed()
        );

        Ok(result)
    }

    async fn embed_query(&self, query: &str) -> RetrievalResult<Embedding> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            RetrievalError::unavailable(Stage::Embedding, "no embedding backend configured")
        })?;
        self.bounded(Stage::Embedding, embedder.embed(query)).await
    }

    async fn vector(
        &self,
        request: &SearchRequest,
        query_vector: &[f32],
        top_k: usize,
    ) -> RetrievalResult<FusionResult> {
        let hits = self
            .bounded(
                Stage::VectorSearch,
                self.store.search(&request.collection, query_vector, top_k, request.score_threshold),
            )
            .await?;
        debug!("Dense search: {} results", hits.len());

        let candidates = hits.into_iter().map(ScoredCandidate::from_vector_hit).collect();
        Ok(FusionResult::new(apply_threshold(
            candidates,
            request.score_threshold,
            top_k,
        )))
    }

    async fn hybrid(
        &self,
        request: &SearchRequest,
        query_vector: &[f32],
        top_k: usize,
    ) -> RetrievalResult<FusionResult> {
        let fetch_k = top_k.saturating_mul(self.config.candidate_multiplier.max(1));
        let hits = self
            .bounded(
                Stage::VectorSearch,
                self.store.search(&request.collection, query_vector, fetch_k, None),
            )
            .await?;

        let (candidates, removed) = dedup_by_chunk_id(hits);
        if removed > 0 {
            debug!("Dropped {} duplicate candidates", removed);
        }
        debug!("Dense search: {} candidates", candidates.len());

        if candidates.is_empty() {
            return Ok(FusionResult::default());
        }

        let lexical = self.lexical_matches(
            &request.collection,
            &request.query,
            &candidates,
            top_k.saturating_mul(2),
        );

        match lexical {
            Ok(lexical) => {
                let (fused, stats) =
                    linear_combination(candidates, &lexical, self.config.hybrid_alpha);
                debug!(
                    "Lexical search: {} hits over {} candidates",
                    stats.lexical_hits, stats.candidates
                );
                if stats.unmatched_lexical > 0 {
                    warn!(
                        "{} of {} lexical hits not among vector candidates (mismatch rate {:.2})",
                        stats.unmatched_lexical,
                        stats.lexical_hits,
                        stats.mismatch_rate()
                    );
                }
                Ok(FusionResult::new(apply_threshold(
                    fused,
                    request.score_threshold,
                    top_k,
                )))
            }
            Err(e) => {
                warn!(
                    "Lexical index unavailable for '{}', using vector-only ranking: {}",
                    request.collection, e
                );
                let ranked = apply_threshold(vector_only(candidates), request.score_threshold, top_k);
                Ok(FusionResult::new(ranked).degraded(Stage::LexicalIndex, e.to_string()))
            }
        }
    }

    /// Build (or reuse) the lexical index over the candidates and query it
    fn lexical_matches(
        &self,
        collection: &str,
        query: &str,
        candidates: &[VectorHit],
        budget: usize,
    ) -> Result<Vec<LexicalMatch>, LexicalError> {
        let documents: Vec<LexicalDocument> = candidates
            .iter()
            .map(|c| LexicalDocument::new(c.chunk_id.clone(), c.content.clone()))
            .collect();

        let index = match &self.cache {
            Some(cache) => cache.get_or_build(collection, &documents, || {
                LexicalIndex::build(collection, documents.clone(), self.analyzer.clone())
            })?,
            None => Arc::new(LexicalIndex::build(
                collection,
                documents,
                self.analyzer.clone(),
            )?),
        };

        let hits = index.search(query, budget)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                index.chunk_id(hit.position).map(|chunk_id| LexicalMatch {
                    chunk_id: chunk_id.to_string(),
                    raw_score: hit.raw_score,
                })
            })
            .collect())
    }

    /// Await a collaborator call with the configured timeout
    async fn bounded<T, E>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T, E>>,
    ) -> RetrievalResult<T>
    where
        RetrievalError: From<E>,
    {
        let timeout_ms = self.config.collaborator_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result.map_err(RetrievalError::from),
            Err(_) => {
                warn!("{} call exceeded {}ms", stage, timeout_ms);
                Err(RetrievalError::Timeout { stage, timeout_ms })
            }
        }
    }
}
