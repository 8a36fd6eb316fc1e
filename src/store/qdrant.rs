//! Qdrant vector store over the REST API

use super::traits::{StoreError, StoreResult, VectorStore};
use super::hit_metadata;
use crate::types::{Chunk, Metadata, VectorHit, VectorPoint};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Qdrant REST client implementing [`VectorStore`]
#[derive(Debug)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f64,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: Value,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<Record>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

/// Points fetched per scroll request
const SCROLL_PAGE: usize = 256;

impl QdrantStore {
    /// Create a client for the Qdrant instance at `url`
    pub fn new(url: &str, api_key: Option<&str>, timeout_secs: u64) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = api_key
            .map(str::to_string)
            .or_else(|| std::env::var("QDRANT_API_KEY").ok());
        if let Some(key) = api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(&key)
                    .map_err(|e| StoreError::RequestFailed(format!("Invalid API key format: {}", e)))?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()?;

        info!("Initialized Qdrant vector store: {}", url);

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Qdrant point ids must be integers or UUIDs
    pub fn point_id(chunk_id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes())
    }

    fn url(&self, collection: &str, path: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, collection, path)
    }

    async fn check(response: reqwest::Response, collection: &str) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::RequestFailed(format!("HTTP error ({}): {}", status, text)));
        }
        Ok(response)
    }

    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> StoreResult<()> {
        let response = self.client.get(self.url(collection, "")).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            Self::check(response, collection).await?;
            return Ok(());
        }

        info!("Creating Qdrant collection '{}' ({} dimensions)", collection, dimensions);
        let body = json!({ "vectors": { "size": dimensions, "distance": "Cosine" } });
        let response = self.client.put(self.url(collection, "")).json(&body).send().await?;
        Self::check(response, collection).await?;
        Ok(())
    }

    fn doc_filter(doc_id: &str) -> Value {
        json!({ "must": [ { "key": "doc_id", "match": { "value": doc_id } } ] })
    }

    fn take_string(payload: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
        match payload.remove(key) {
            Some(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    fn to_chunk(record: Record) -> Chunk {
        let mut payload = record.payload.unwrap_or_default();
        let chunk_id = Self::take_string(&mut payload, "chunk_id").unwrap_or_else(|| match record.id {
            Value::String(id) => id,
            other => other.to_string(),
        });
        let index = payload
            .remove("chunk_index")
            .and_then(|v| v.as_u64())
            .unwrap_or_default() as usize;
        Chunk {
            chunk_id,
            doc_id: Self::take_string(&mut payload, "doc_id").unwrap_or_default(),
            index,
            content: Self::take_string(&mut payload, "content").unwrap_or_default(),
            source_filename: Self::take_string(&mut payload, "filename").unwrap_or_default(),
            metadata: payload.into_iter().collect::<Metadata>(),
        }
    }

    fn to_hit(point: ScoredPoint) -> VectorHit {
        let mut payload = point.payload.unwrap_or_default();
        let chunk_id = match payload.remove("chunk_id") {
            Some(Value::String(id)) => id,
            _ => match point.id {
                Value::String(id) => id,
                other => other.to_string(),
            },
        };
        let content = match payload.remove("content") {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        VectorHit {
            chunk_id,
            content,
            score: point.score,
            metadata: payload.into_iter().collect::<Metadata>(),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: Option<f64>,
    ) -> StoreResult<Vec<VectorHit>> {
        let mut body = json!({
            "vector": query_vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(threshold) = score_threshold {
            body["score_threshold"] = json!(threshold);
        }

        let response = self
            .client
            .post(self.url(collection, "/points/search"))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, collection).await?;
        let parsed: QdrantResponse<Vec<ScoredPoint>> = response.json().await?;

        debug!("Qdrant search in '{}': {} hits", collection, parsed.result.len());
        Ok(parsed.result.into_iter().map(Self::to_hit).collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> StoreResult<usize> {
        let Some(first) = points.first() else {
            return Ok(0);
        };
        self.ensure_collection(collection, first.vector.len()).await?;

        let written = points.len();
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                let mut payload = hit_metadata(&p.chunk);
                payload.insert("chunk_id".to_string(), json!(p.chunk.chunk_id));
                payload.insert("content".to_string(), json!(p.chunk.content));
                json!({
                    "id": Self::point_id(&p.chunk.chunk_id).to_string(),
                    "vector": p.vector,
                    "payload": payload,
                })
            })
            .collect();

        let response = self
            .client
            .put(self.url(collection, "/points?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::check(response, collection).await?;

        debug!("Upserted {} points into Qdrant collection '{}'", written, collection);
        Ok(written)
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<usize> {
        let response = self
            .client
            .post(self.url(collection, "/points/count"))
            .json(&json!({ "filter": Self::doc_filter(doc_id), "exact": true }))
            .send()
            .await?;
        let count: QdrantResponse<CountResult> = Self::check(response, collection).await?.json().await?;
        if count.result.count == 0 {
            return Ok(0);
        }

        let response = self
            .client
            .post(self.url(collection, "/points/delete?wait=true"))
            .json(&json!({ "filter": Self::doc_filter(doc_id) }))
            .send()
            .await?;
        Self::check(response, collection).await?;

        debug!("Deleted {} points of document {} from '{}'", count.result.count, doc_id, collection);
        Ok(count.result.count)
    }

    async fn count(&self, collection: &str) -> StoreResult<usize> {
        let response = self
            .client
            .post(self.url(collection, "/points/count"))
            .json(&json!({ "exact": true }))
            .send()
            .await?;
        match Self::check(response, collection).await {
            Ok(response) => {
                let parsed: QdrantResponse<CountResult> = response.json().await?;
                Ok(parsed.result.count)
            }
            Err(StoreError::CollectionNotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn document_chunks(&self, collection: &str, doc_id: Option<&str>) -> StoreResult<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE,
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(doc_id) = doc_id {
                body["filter"] = Self::doc_filter(doc_id);
            }
            if let Some(offset) = offset.take() {
                body["offset"] = offset;
            }

            let response = self
                .client
                .post(self.url(collection, "/points/scroll"))
                .json(&body)
                .send()
                .await?;
            let page: QdrantResponse<ScrollResult> = match Self::check(response, collection).await {
                Ok(response) => response.json().await?,
                Err(StoreError::CollectionNotFound(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            chunks.extend(page.result.points.into_iter().map(Self::to_chunk));
            match page.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        chunks.sort_by(|a, b| a.doc_id.cmp(&b.doc_id).then(a.index.cmp(&b.index)));
        debug!("Scrolled {} chunks from Qdrant collection '{}'", chunks.len(), collection);
        Ok(chunks)
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable() {
        assert_eq!(QdrantStore::point_id("doc_0"), QdrantStore::point_id("doc_0"));
        assert_ne!(QdrantStore::point_id("doc_0"), QdrantStore::point_id("doc_1"));
    }

    #[test]
    fn test_to_hit_reads_payload() {
        let point: ScoredPoint = serde_json::from_value(json!({
            "id": "3f2c0d5e-0000-5000-8000-000000000000",
            "score": 0.83,
            "payload": {
                "chunk_id": "doc_2",
                "content": "passage text",
                "doc_id": "doc",
                "filename": "a.txt"
            }
        }))
        .unwrap();

        let hit = QdrantStore::to_hit(point);
        assert_eq!(hit.chunk_id, "doc_2");
        assert_eq!(hit.content, "passage text");
        assert!((hit.score - 0.83).abs() < 1e-12);
        assert_eq!(hit.metadata.get("filename"), Some(&json!("a.txt")));
        assert!(!hit.metadata.contains_key("content"));
    }

    #[test]
    fn test_to_hit_falls_back_to_point_id() {
        let point: ScoredPoint =
            serde_json::from_value(json!({ "id": 42, "score": 0.5 })).unwrap();
        let hit = QdrantStore::to_hit(point);
        assert_eq!(hit.chunk_id, "42");
        assert!(hit.content.is_empty());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let store = QdrantStore::new("http://localhost:6333/", None, 5).unwrap();
        assert_eq!(store.url("docs", "/points/search"), "http://localhost:6333/collections/docs/points/search");
        assert_eq!(store.name(), "qdrant");
    }

    #[test]
    fn test_to_chunk_reads_payload() {
        let record: Record = serde_json::from_value(json!({
            "id": "3f2c0d5e-0000-5000-8000-000000000000",
            "payload": {
                "chunk_id": "doc_2",
                "content": "passage text",
                "doc_id": "doc",
                "chunk_index": 2,
                "filename": "a.txt",
                "ingested_at": "2024-06-01T12:00:00Z"
            }
        }))
        .unwrap();

        let chunk = QdrantStore::to_chunk(record);
        assert_eq!(chunk.chunk_id, "doc_2");
        assert_eq!(chunk.doc_id, "doc");
        assert_eq!(chunk.index, 2);
        assert_eq!(chunk.content, "passage text");
        assert_eq!(chunk.source_filename, "a.txt");
        assert_eq!(chunk.metadata.len(), 1);
        assert_eq!(chunk.metadata.get("ingested_at"), Some(&json!("2024-06-01T12:00:00Z")));
    }

    #[test]
    fn test_scroll_page_parses_offset() {
        let page: QdrantResponse<ScrollResult> = serde_json::from_value(json!({
            "result": {
                "points": [ { "id": 7, "payload": { "doc_id": "d", "chunk_index": 0 } } ],
                "next_page_offset": null
            },
            "status": "ok",
            "time": 0.001
        }))
        .unwrap();
        assert!(page.result.next_page_offset.is_none());

        let chunk = QdrantStore::to_chunk(page.result.points.into_iter().next().unwrap());
        assert_eq!(chunk.chunk_id, "7");
        assert_eq!(chunk.doc_id, "d");
        assert!(chunk.content.is_empty());
    }
}
