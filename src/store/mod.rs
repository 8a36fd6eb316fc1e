//! Vector store collaborators
//!
//! - **Memory**: brute-force cosine search, optional JSON snapshots
//! - **Qdrant**: REST client for a Qdrant server
//!
//! ```toml
//! [store]
//! backend = "memory"
//! snapshot_dir = "./ragcore_data"
//! ```

mod memory;
mod qdrant;
mod traits;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;
pub use traits::{
    check_dimensions, cosine_similarity, paginate, summarize_documents, StoreError, StoreResult,
    VectorStore,
};

use crate::config::StoreConfig;
use crate::types::{Chunk, Metadata};
use std::sync::Arc;
use tracing::info;

/// Create a vector store from configuration
pub fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn VectorStore>> {
    match config {
        StoreConfig::Memory { snapshot_dir } => {
            let store = match snapshot_dir {
                Some(dir) => MemoryVectorStore::open(dir)?,
                None => {
                    info!("Creating non-persistent memory vector store");
                    MemoryVectorStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        StoreConfig::Qdrant {
            url,
            api_key,
            timeout_secs,
        } => Ok(Arc::new(QdrantStore::new(url, api_key.as_deref(), *timeout_secs)?)),
    }
}

/// Metadata returned with a hit: the chunk's own metadata plus its origin
pub(crate) fn hit_metadata(chunk: &Chunk) -> Metadata {
    let mut metadata = chunk.metadata.clone();
    metadata.insert("doc_id".to_string(), chunk.doc_id.clone().into());
    metadata.insert("chunk_index".to_string(), chunk.index.into());
    metadata.insert("filename".to_string(), chunk.source_filename.clone().into());
    metadata
}
