//! Per-collection cache of built lexical indexes
//!
//! Entries are keyed by collection and a fingerprint of the exact candidate
//! set, so a cached index is only reused for identical inputs. Concurrent
//! builders may race; the last insert wins and readers keep whatever `Arc`
//! they already hold.

use super::bm25::{LexicalDocument, LexicalIndex};
use crate::types::CollectionId;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use xxhash_rust::xxh3::Xxh3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    collection: CollectionId,
    fingerprint: u64,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded LRU of lexical indexes
pub struct LexicalIndexCache {
    entries: Mutex<LruCache<CacheKey, Arc<LexicalIndex>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LexicalIndexCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache sized from configuration; `None` when caching is disabled
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    /// Return the cached index for this candidate set, or build and install one.
    ///
    /// The build runs outside the lock. Failed builds are not cached.
    pub fn get_or_build<E>(
        &self,
        collection: &str,
        documents: &[LexicalDocument],
        build: impl FnOnce() -> Result<LexicalIndex, E>,
    ) -> Result<Arc<LexicalIndex>, E> {
        let key = CacheKey {
            collection: collection.to_string(),
            fingerprint: fingerprint(documents),
        };

        if let Some(index) = self.entries.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Lexical index cache hit for '{}'", collection);
            return Ok(index);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let index = Arc::new(build()?);
        self.entries.lock().put(key, index.clone());
        Ok(index)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }
}

/// Order-sensitive hash of a candidate set
pub fn fingerprint(documents: &[LexicalDocument]) -> u64 {
    let mut hasher = Xxh3::new();
    for doc in documents {
        hasher.update(&(doc.chunk_id.len() as u64).to_le_bytes());
        hasher.update(doc.chunk_id.as_bytes());
        hasher.update(&(doc.content.len() as u64).to_le_bytes());
        hasher.update(doc.content.as_bytes());
    }
    hasher.digest()
}
