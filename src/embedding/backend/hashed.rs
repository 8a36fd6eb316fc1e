//! Offline feature-hashing embedder
//!
//! Hashes analyzer terms into a fixed number of buckets with a signed xxh3
//! hash. Texts sharing terms get similar vectors, which is enough for tests,
//! demos and air-gapped setups without an embedding service.

use super::traits::{normalize_embedding, EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::retrieval::{TextAnalyzer, UnicodeAnalyzer};
use crate::types::Embedding;
use async_trait::async_trait;
use xxhash_rust::xxh3::xxh3_64_with_seed;

#[derive(Debug, Clone)]
pub struct HashedBackend {
    dimensions: usize,
    analyzer: UnicodeAnalyzer,
}

impl HashedBackend {
    pub fn new(dimensions: usize) -> EmbeddingResult<Self> {
        if dimensions == 0 {
            return Err(EmbeddingError::Config("dimensions must be positive".to_string()));
        }
        Ok(Self {
            dimensions,
            analyzer: UnicodeAnalyzer,
        })
    }

    fn embed_sync(&self, text: &str) -> EmbeddingResult<Embedding> {
        let terms = self
            .analyzer
            .analyze(text)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        let mut vector = vec![0.0f32; self.dimensions];
        for term in terms {
            let hash = xxh3_64_with_seed(term.as_bytes(), 0);
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        Ok(normalize_embedding(&vector))
    }
}

#[async_trait]
impl EmbeddingBackend for HashedBackend {
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        self.embed_sync(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        texts.iter().map(|t| self.embed_sync(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashed"
    }
}
