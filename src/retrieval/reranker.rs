//! Cross-encoder style reranking of fused candidates
//!
//! A [`RerankProvider`] scores (query, passage) pairs; the [`Reranker`]
//! attaches those scores, re-sorts and truncates. A provider that fails to
//! load or warm up disables reranking for the process lifetime, while a
//! failure on a single call only falls back to the pre-rerank order for that
//! call.

use super::analyzer::{TextAnalyzer, UnicodeAnalyzer};
use crate::config::{RerankBackendConfig, RerankConfig};
use crate::types::{FusionResult, ScoredCandidate, Stage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[cfg(feature = "onnx")]
use super::cross_encoder::CrossEncoderProvider;
use super::rerank_http::HttpRerankProvider;

/// Errors raised by rerank providers
#[derive(Debug, thiserror::Error)]
pub enum RerankError {
    #[error("Rerank model unavailable: {0}")]
    Unavailable(String),

    #[error("Rerank request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type RerankResult<T> = Result<T, RerankError>;

/// Relevance model scoring query/passage pairs
#[async_trait]
pub trait RerankProvider: Send + Sync + Debug {
    /// One score per passage, in passage order; higher is more relevant
    async fn score_pairs(&self, query: &str, passages: &[String]) -> RerankResult<Vec<f32>>;

    /// Check the model is usable before serving requests
    async fn warm_up(&self) -> RerankResult<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Reranking stage of the retrieval pipeline
#[derive(Debug, Clone)]
pub struct Reranker {
    provider: Option<Arc<dyn RerankProvider>>,
    default_top_k: usize,
    timeout: Duration,
}

impl Reranker {
    /// A reranker that passes candidates through, truncated
    pub fn disabled(default_top_k: usize) -> Self {
        Self {
            provider: None,
            default_top_k,
            timeout: Duration::ZERO,
        }
    }

    /// Enabled reranker over a provider that is known to work
    pub fn new(provider: Arc<dyn RerankProvider>, default_top_k: usize, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            default_top_k,
            timeout,
        }
    }

    /// Warm the provider up; any failure leaves the reranker disabled
    pub async fn initialize(
        provider: RerankResult<Arc<dyn RerankProvider>>,
        default_top_k: usize,
        timeout: Duration,
    ) -> Self {
        let provider = match provider {
            Ok(provider) => provider,
            Err(e) => {
                error!("Failed to load rerank model, reranking disabled: {}", e);
                return Self::disabled(default_top_k);
            }
        };

        match tokio::time::timeout(timeout, provider.warm_up()).await {
            Ok(Ok(())) => {
                info!("Reranker ready: provider={}", provider.name());
                Self::new(provider, default_top_k, timeout)
            }
            Ok(Err(e)) => {
                error!("Rerank warm-up failed for {}, reranking disabled: {}", provider.name(), e);
                Self::disabled(default_top_k)
            }
            Err(_) => {
                error!(
                    "Rerank warm-up for {} timed out after {:?}, reranking disabled",
                    provider.name(),
                    timeout
                );
                Self::disabled(default_top_k)
            }
        }
    }

    /// Build from configuration; disabled when `use_rerank` is off or no provider is set
    pub async fn from_config(config: &RerankConfig, timeout: Duration) -> Self {
        match (&config.provider, config.use_rerank) {
            (Some(provider), true) => {
                Self::initialize(create_rerank_provider(provider), config.rerank_top_k, timeout)
                    .await
            }
            _ => {
                info!("Reranking disabled by configuration");
                Self::disabled(config.rerank_top_k)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Re-order candidates by model relevance and keep the first `top_k`,
    /// or the configured default when none is given
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<ScoredCandidate>,
        top_k: Option<usize>,
    ) -> FusionResult {
        let top_k = top_k.unwrap_or(self.default_top_k);
        let Some(provider) = &self.provider else {
            candidates.truncate(top_k);
            return FusionResult::new(candidates);
        };
        if candidates.is_empty() {
            return FusionResult::default();
        }

        debug!("Reranking {} candidates with {}", candidates.len(), provider.name());
        let passages: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();

        let outcome = match tokio::time::timeout(self.timeout, provider.score_pairs(query, &passages)).await {
            Ok(Ok(scores)) if scores.len() == candidates.len() => Ok(scores),
            Ok(Ok(scores)) => Err(format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            )),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}ms", self.timeout.as_millis())),
        };

        match outcome {
            Ok(scores) => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.rerank_score = Some(f64::from(score));
                }
                candidates.sort_by(|a, b| rank_key(b).total_cmp(&rank_key(a)));
                candidates.truncate(top_k);
                FusionResult::new(candidates)
            }
            Err(reason) => {
                warn!("Rerank failed, keeping fused order: {}", reason);
                candidates.truncate(top_k);
                FusionResult::new(candidates).degraded(Stage::Rerank, reason)
            }
        }
    }
}

fn rank_key(candidate: &ScoredCandidate) -> f64 {
    candidate
        .rerank_score
        .filter(|s| s.is_finite())
        .unwrap_or(f64::NEG_INFINITY)
}

/// Share of distinct query terms present in the passage
///
/// Heuristic stand-in for a cross-encoder when no model is available.
#[derive(Debug, Clone, Default)]
pub struct TermOverlapProvider {
    analyzer: UnicodeAnalyzer,
}

impl TermOverlapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn score(&self, query_terms: &HashSet<String>, passage: &str) -> RerankResult<f32> {
        if query_terms.is_empty() {
            return Ok(0.0);
        }
        let passage_terms: HashSet<String> = self
            .analyzer
            .analyze(passage)
            .map_err(|e| RerankError::RequestFailed(e.to_string()))?
            .into_iter()
            .collect();
        let overlap = query_terms.intersection(&passage_terms).count();
        Ok(overlap as f32 / query_terms.len() as f32)
    }
}

#[async_trait]
impl RerankProvider for TermOverlapProvider {
    async fn score_pairs(&self, query: &str, passages: &[String]) -> RerankResult<Vec<f32>> {
        let query_terms: HashSet<String> = self
            .analyzer
            .analyze(query)
            .map_err(|e| RerankError::RequestFailed(e.to_string()))?
            .into_iter()
            .collect();
        passages.iter().map(|p| self.score(&query_terms, p)).collect()
    }

    fn name(&self) -> &str {
        "overlap"
    }
}

/// Create a rerank provider from configuration
pub fn create_rerank_provider(config: &RerankBackendConfig) -> RerankResult<Arc<dyn RerankProvider>> {
    match config {
        RerankBackendConfig::Http {
            endpoint,
            api_key,
            model,
            timeout_secs,
        } => {
            info!("Creating HTTP rerank provider: endpoint={}", endpoint);
            Ok(Arc::new(HttpRerankProvider::new(
                endpoint,
                api_key.as_deref(),
                model,
                *timeout_secs,
            )?))
        }
        RerankBackendConfig::Overlap => Ok(Arc::new(TermOverlapProvider::new())),
        #[cfg(feature = "onnx")]
        RerankBackendConfig::Onnx {
            model_path,
            tokenizer_path,
            max_length,
        } => Ok(Arc::new(CrossEncoderProvider::new(
            model_path,
            tokenizer_path,
            *max_length,
        )?)),
        #[cfg(not(feature = "onnx"))]
        RerankBackendConfig::Onnx { .. } => Err(RerankError::Config(
            "ONNX reranking requires building with the `onnx` feature".to_string(),
        )),
    }
}
