//! HTTP embedding backend for OpenAI-compatible APIs
//!
//! This backend supports any OpenAI-compatible embedding API, including:
//! - OpenAI API
//! - Azure OpenAI
//! - Local servers (LM Studio, vLLM, Ollama with OpenAI compat, text-embeddings-inference)

use super::traits::{normalize_embedding, EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::types::Embedding;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the HTTP embedding backend
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API endpoint (e.g., "https://api.openai.com/v1/embeddings")
    pub endpoint: String,
    /// API key (optional, can be from env var)
    pub api_key: Option<String>,
    /// Model name (e.g., "text-embedding-3-small")
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum batch size for requests
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
            max_batch_size: 100,
        }
    }
}

/// HTTP embedding backend for OpenAI-compatible APIs
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    config: HttpConfig,
}

/// OpenAI embedding request format
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<&'a str>,
}

/// OpenAI embedding response format
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: usize,
}

/// OpenAI error response format
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl HttpBackend {
    /// Create a new HTTP embedding backend
    pub fn new(config: HttpConfig) -> EmbeddingResult<Self> {
        info!(
            "Initializing HTTP embedding backend: endpoint={}, model={}",
            config.endpoint, config.model
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // API key from config or environment
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| EmbeddingError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") || config.endpoint.contains("azure.com") {
            warn!("No API key provided for {}", config.endpoint);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn request_body<'a>(&'a self, texts: &'a [&'a str]) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            // Only text-embedding-3-* accepts a dimensions override
            dimensions: if self.config.model.contains("text-embedding-3") {
                Some(self.config.dimensions)
            } else {
                None
            },
            encoding_format: Some("float"),
        }
    }

    /// Make an embedding request to the API
    async fn request_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Embedding>> {
        debug!(
            "Sending embedding request to {} for {} texts",
            self.config.endpoint,
            texts.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(texts))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000);

            return Err(EmbeddingError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::EmbeddingFailed(describe_error(status, &error_text)));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &embedding_response.usage {
            debug!("Embedding request used {} tokens", usage.total_tokens);
        }

        collect_embeddings(embedding_response, texts.len())
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => format!("API error ({}): {}", status, parsed.error.message),
        Err(_) => format!("HTTP error ({}): {}", status, body),
    }
}

/// Order embeddings by their `index` and check the count
fn collect_embeddings(response: EmbeddingResponse, expected: usize) -> EmbeddingResult<Vec<Embedding>> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(EmbeddingError::EmbeddingFailed(format!(
            "Expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data
        .into_iter()
        .map(|d| normalize_embedding(&d.embedding))
        .collect())
}

#[async_trait]
impl EmbeddingBackend for HttpBackend {
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let embeddings = self.request_embeddings(&[text]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in text_refs.chunks(self.config.max_batch_size.max(1)) {
            all_embeddings.extend(self.request_embeddings(batch).await?);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_batch_size, 100);
    }

    #[test]
    fn test_request_body_dimensions_only_for_v3_models() {
        let backend = HttpBackend::new(HttpConfig {
            api_key: Some("test".to_string()),
            ..Default::default()
        })
        .unwrap();
        let texts = ["a"];
        let body = serde_json::to_value(backend.request_body(&texts)).unwrap();
        assert_eq!(body["dimensions"], 1536);
        assert_eq!(body["input"][0], "a");

        let backend = HttpBackend::new(HttpConfig {
            endpoint: "http://localhost:1234/v1/embeddings".to_string(),
            model: "nomic-embed-text-v1.5".to_string(),
            ..Default::default()
        })
        .unwrap();
        let body = serde_json::to_value(backend.request_body(&texts)).unwrap();
        assert!(body.get("dimensions").is_none());
    }

    #[test]
    fn test_collect_embeddings_sorts_and_normalizes() {
        let response: EmbeddingResponse = serde_json::from_value(serde_json::json!({
            "data": [
                { "embedding": [0.0, 2.0], "index": 1 },
                { "embedding": [3.0, 4.0], "index": 0 }
            ],
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        }))
        .unwrap();

        let embeddings = collect_embeddings(response, 2).unwrap();
        assert!((embeddings[0][0] - 0.6).abs() < 1e-6);
        assert!((embeddings[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collect_embeddings_rejects_wrong_count() {
        let response: EmbeddingResponse =
            serde_json::from_value(serde_json::json!({ "data": [] })).unwrap();
        assert!(collect_embeddings(response, 1).is_err());
    }

    #[test]
    fn test_describe_error_prefers_api_message() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        let msg = describe_error(status, r#"{"error": {"message": "bad input", "type": "invalid"}}"#);
        assert!(msg.contains("bad input"));
        let msg = describe_error(status, "plain failure");
        assert!(msg.contains("plain failure"));
    }
}
