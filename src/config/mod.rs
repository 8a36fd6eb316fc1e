//! Configuration for ragcore

mod embedding;
mod index;
mod logging;
mod rerank;
mod store;

pub use embedding::BackendConfig;
pub use index::{ChunkingConfig, RetrievalConfig, DEFAULT_SEPARATORS};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use rerank::{RerankBackendConfig, RerankConfig};
pub use store::StoreConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest chunk size accepted, in tokens
pub const MAX_CHUNK_SIZE: usize = 8192;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Hybrid retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Rerank configuration
    #[serde(default)]
    pub rerank: RerankConfig,
    /// Embedding backend
    #[serde(default)]
    pub embedding: BackendConfig,
    /// Vector store backend
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Collects every error so they can be fixed in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Chunking
        if self.chunking.chunk_size == 0 {
            errors.push("chunk_size must be positive".to_string());
        }
        if self.chunking.chunk_size > MAX_CHUNK_SIZE {
            errors.push(format!("chunk_size must be <= {}", MAX_CHUNK_SIZE));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            errors.push(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.chunking.separators.is_empty() {
            errors.push("separators must not be empty".to_string());
        }

        // Retrieval
        if !(0.0..=1.0).contains(&self.retrieval.hybrid_alpha) {
            errors.push("hybrid_alpha must be between 0.0 and 1.0".to_string());
        }
        if self.retrieval.max_top_k == 0 {
            errors.push("max_top_k must be positive".to_string());
        }
        if self.retrieval.default_top_k == 0 || self.retrieval.default_top_k > self.retrieval.max_top_k {
            errors.push(format!(
                "default_top_k must be between 1 and max_top_k ({})",
                self.retrieval.max_top_k
            ));
        }
        if self.retrieval.candidate_multiplier == 0 {
            errors.push("candidate_multiplier must be positive".to_string());
        }
        if self.retrieval.collaborator_timeout_ms == 0 {
            errors.push("collaborator_timeout_ms must be positive".to_string());
        }
        if self.retrieval.default_collection.trim().is_empty() {
            errors.push("default_collection must not be empty".to_string());
        }

        // Rerank
        if self.rerank.rerank_top_k == 0 {
            errors.push("rerank_top_k must be positive".to_string());
        }
        if let Some(RerankBackendConfig::Http { endpoint, .. }) = &self.rerank.provider {
            if endpoint.trim().is_empty() {
                errors.push("rerank endpoint must not be empty".to_string());
            }
        }

        // Embedding
        let dimensions = self.embedding.dimensions();
        if dimensions == 0 {
            errors.push("embedding dimensions must be positive".to_string());
        }
        if dimensions > 4096 {
            errors.push("embedding dimensions must be <= 4096".to_string());
        }
        if let BackendConfig::Http { endpoint, max_batch_size, .. } = &self.embedding {
            if endpoint.trim().is_empty() {
                errors.push("embedding endpoint must not be empty".to_string());
            }
            if *max_batch_size == 0 {
                errors.push("embedding max_batch_size must be positive".to_string());
            }
        }

        // Store
        if let StoreConfig::Qdrant { url, .. } = &self.store {
            if url.trim().is_empty() {
                errors.push("qdrant url must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn default_values_match_documented_defaults() {
        let cfg = valid_config();
        assert_eq!(cfg.chunking.chunk_size, 500);
        assert_eq!(cfg.chunking.chunk_overlap, 50);
        assert!((cfg.retrieval.hybrid_alpha - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.retrieval.default_top_k, 10);
        assert_eq!(cfg.rerank.rerank_top_k, 3);
        assert!(cfg.rerank.use_rerank);
        assert_eq!(cfg.chunking.separators.last().map(String::as_str), Some(""));
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let mut cfg = valid_config();
        cfg.chunking.chunk_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size must be positive"));
    }

    #[test]
    fn validate_rejects_overlap_not_smaller_than_chunk_size() {
        let mut cfg = valid_config();
        cfg.chunking.chunk_size = 100;
        cfg.chunking.chunk_overlap = 100;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap (100) must be less than chunk_size (100)"));
    }

    #[test]
    fn validate_rejects_alpha_out_of_range() {
        let mut cfg = valid_config();
        cfg.retrieval.hybrid_alpha = 1.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("hybrid_alpha must be between 0.0 and 1.0"));

        cfg.retrieval.hybrid_alpha = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_alpha_bounds() {
        let mut cfg = valid_config();
        cfg.retrieval.hybrid_alpha = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.retrieval.hybrid_alpha = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.chunking.chunk_size = 0;
        cfg.retrieval.candidate_multiplier = 0;
        cfg.rerank.rerank_top_k = 0;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("chunk_size must be positive"));
        assert!(msg.contains("candidate_multiplier must be positive"));
        assert!(msg.contains("rerank_top_k must be positive"));
    }

    #[test]
    fn validate_rejects_default_top_k_above_max() {
        let mut cfg = valid_config();
        cfg.retrieval.default_top_k = 101;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("default_top_k must be between 1 and max_top_k (100)"));
    }

    #[test]
    fn parse_partial_toml_uses_defaults() {
        let cfg = Config::from_toml(
            r#"
            [retrieval]
            hybrid_alpha = 0.5

            [embedding]
            backend = "http"
            endpoint = "http://localhost:1234/v1/embeddings"
            model = "nomic-embed-text-v1.5"
            dimensions = 768

            [store]
            backend = "qdrant"
            url = "http://localhost:6333"

            [rerank.provider]
            backend = "http"
            endpoint = "http://localhost:8080/rerank"
            model = "bge-reranker-base"
            "#,
        )
        .unwrap();

        assert!((cfg.retrieval.hybrid_alpha - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.retrieval.default_top_k, 10);
        assert_eq!(cfg.chunking.chunk_size, 500);
        assert_eq!(cfg.embedding.dimensions(), 768);
        match &cfg.store {
            StoreConfig::Qdrant { url, timeout_secs, .. } => {
                assert_eq!(url, "http://localhost:6333");
                assert_eq!(*timeout_secs, 30);
            }
            other => panic!("unexpected store config: {:?}", other),
        }
        match &cfg.rerank.provider {
            Some(RerankBackendConfig::Http { model, timeout_secs, .. }) => {
                assert_eq!(model, "bge-reranker-base");
                assert_eq!(*timeout_secs, 15);
            }
            other => panic!("unexpected rerank provider: {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_invalid_values() {
        let err = Config::from_toml("[chunking]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_size must be positive"));
    }

    #[test]
    fn toml_roundtrip_of_default_config() {
        let cfg = valid_config();
        let text = cfg.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.chunking.separators, cfg.chunking.separators);
        assert_eq!(parsed.store, cfg.store);
        assert_eq!(parsed.rerank.provider, cfg.rerank.provider);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ragcore.toml");
        std::fs::write(&path, "[rerank]\nuse_rerank = false\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert!(!cfg.rerank.use_rerank);
    }

    #[test]
    fn load_missing_file_names_path() {
        let err = Config::load(Path::new("/nonexistent/ragcore.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ragcore.toml"));
    }
}
