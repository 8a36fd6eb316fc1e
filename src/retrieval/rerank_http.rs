//! HTTP rerank provider for `/rerank` style APIs
//!
//! Works with Jina, Cohere-compatible gateways and text-embeddings-inference:
//! the request carries `{model, query, documents}` and the response lists
//! `results[{index, relevance_score}]`.

use super::reranker::{RerankError, RerankProvider, RerankResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct HttpRerankProvider {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

impl HttpRerankProvider {
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> RerankResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| RerankError::Config(format!("Invalid API key format: {}", e)))?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RerankError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }
}

/// Scatter indexed results back into passage order
fn scores_in_order(response: RerankResponse, expected: usize) -> RerankResult<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for item in response.results {
        match scores.get_mut(item.index) {
            Some(slot) => *slot = Some(item.relevance_score),
            None => {
                return Err(RerankError::RequestFailed(format!(
                    "result index {} out of range for {} documents",
                    item.index, expected
                )))
            }
        }
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            s.ok_or_else(|| RerankError::RequestFailed(format!("no score for document {}", i)))
        })
        .collect()
}

#[async_trait]
impl RerankProvider for HttpRerankProvider {
    async fn score_pairs(&self, query: &str, passages: &[String]) -> RerankResult<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Sending rerank request for {} documents", passages.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RerankRequest {
                model: &self.model,
                query,
                documents: passages,
                top_n: passages.len(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RerankError::RequestFailed(format!("HTTP error ({}): {}", status, body)));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RerankError::RequestFailed(format!("Failed to parse response: {}", e)))?;
        scores_in_order(parsed, passages.len())
    }

    async fn warm_up(&self) -> RerankResult<()> {
        self.score_pairs("ping", &["pong".to_string()])
            .await
            .map(|_| ())
            .map_err(|e| RerankError::Unavailable(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}
