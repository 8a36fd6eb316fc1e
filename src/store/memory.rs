//! In-process vector store with brute-force cosine search
//!
//! Suited to tests, the CLI and small collections. With a snapshot directory
//! each collection is mirrored to `<dir>/<name>-<hash>.json` after every write
//! and reloaded on open.

use super::traits::{check_dimensions, cosine_similarity, StoreResult, VectorStore};
use super::hit_metadata;
use crate::types::{Chunk, VectorHit, VectorPoint};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    collection: &'a str,
    points: &'a [VectorPoint],
}

#[derive(Deserialize)]
struct Snapshot {
    collection: String,
    points: Vec<VectorPoint>,
}

/// In-memory vector store
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<VectorPoint>>>,
    snapshot_dir: Option<PathBuf>,
}

impl MemoryVectorStore {
    /// Create an empty, non-persistent store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted under `dir`, loading existing snapshots
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut collections = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = std::fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
            debug!(
                "Loaded {} points for collection '{}' from {}",
                snapshot.points.len(),
                snapshot.collection,
                path.display()
            );
            collections.insert(snapshot.collection, snapshot.points);
        }

        info!(
            "Opened memory vector store at {} ({} collections)",
            dir.display(),
            collections.len()
        );

        Ok(Self {
            collections: RwLock::new(collections),
            snapshot_dir: Some(dir),
        })
    }

    /// Names of all collections, sorted
    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// File name is a readable prefix plus a hash of the exact collection
    /// name, so distinct names never share a snapshot
    fn snapshot_path(dir: &Path, collection: &str) -> PathBuf {
        let readable: String = collection
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        dir.join(format!("{}-{:016x}.json", readable, xxh3_64(collection.as_bytes())))
    }

    async fn persist(&self, collection: &str) -> StoreResult<()> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(());
        };

        let bytes = {
            let guard = self.collections.read();
            let points = guard.get(collection).map(Vec::as_slice).unwrap_or(&[]);
            serde_json::to_vec(&SnapshotRef { collection, points })?
        };

        let path = Self::snapshot_path(dir, collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: Option<f64>,
    ) -> StoreResult<Vec<VectorHit>> {
        let guard = self.collections.read();
        let Some(points) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        if let Some(first) = points.first() {
            check_dimensions(first.vector.len(), query_vector.len())?;
        }

        let mut scored: Vec<(f64, &VectorPoint)> = points
            .iter()
            .map(|p| (f64::from(cosine_similarity(query_vector, &p.vector)), p))
            .filter(|(score, _)| score_threshold.is_none_or(|t| *score >= t))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, point)| VectorHit {
                chunk_id: point.chunk.chunk_id.clone(),
                content: point.chunk.content.clone(),
                score,
                metadata: hit_metadata(&point.chunk),
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> StoreResult<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let written = points.len();
        {
            let mut guard = self.collections.write();
            let existing = guard.entry(collection.to_string()).or_default();

            let expected = existing
                .first()
                .or_else(|| points.first())
                .map(|p| p.vector.len())
                .unwrap_or_default();
            for point in &points {
                check_dimensions(expected, point.vector.len())?;
            }

            let mut positions: HashMap<String, usize> = existing
                .iter()
                .enumerate()
                .map(|(i, p)| (p.chunk.chunk_id.clone(), i))
                .collect();
            for point in points {
                match positions.get(&point.chunk.chunk_id) {
                    Some(&i) => existing[i] = point,
                    None => {
                        positions.insert(point.chunk.chunk_id.clone(), existing.len());
                        existing.push(point);
                    }
                }
            }
        }

        self.persist(collection).await?;
        debug!("Upserted {} points into '{}'", written, collection);
        Ok(written)
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<usize> {
        let removed = {
            let mut guard = self.collections.write();
            match guard.get_mut(collection) {
                Some(points) => {
                    let before = points.len();
                    points.retain(|p| p.chunk.doc_id != doc_id);
                    before - points.len()
                }
                None => 0,
            }
        };

        if removed > 0 {
            self.persist(collection).await?;
        }
        debug!("Deleted {} points of document {} from '{}'", removed, doc_id, collection);
        Ok(removed)
    }

    async fn count(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.collections.read().get(collection).map_or(0, Vec::len))
    }

    async fn document_chunks(&self, collection: &str, doc_id: Option<&str>) -> StoreResult<Vec<Chunk>> {
        let guard = self.collections.read();
        let mut chunks: Vec<Chunk> = guard
            .get(collection)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| doc_id.is_none_or(|id| p.chunk.doc_id == id))
                    .map(|p| p.chunk.clone())
                    .collect()
            })
            .unwrap_or_default();
        chunks.sort_by(|a, b| a.doc_id.cmp(&b.doc_id).then(a.index.cmp(&b.index)));
        Ok(chunks)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
