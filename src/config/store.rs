//! Vector store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_qdrant_timeout() -> u64 {
    30
}

/// Vector store backend
///
/// ```toml
/// [store]
/// backend = "qdrant"
/// url = "http://localhost:6333"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process brute-force store, optionally snapshotted to JSON files
    Memory {
        #[serde(default)]
        snapshot_dir: Option<PathBuf>,
    },

    /// Qdrant over its REST API
    Qdrant {
        url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_qdrant_timeout")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory {
            snapshot_dir: Some(PathBuf::from("./ragcore_data")),
        }
    }
}
