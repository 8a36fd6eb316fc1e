//! BM25 lexical index over a bounded candidate set
//!
//! The index is built from scratch for each candidate set and never mutated
//! afterwards, so a built index can be shared freely behind an `Arc`.

use super::analyzer::{AnalyzerError, TextAnalyzer};
use crate::types::{ChunkId, CollectionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Term frequency saturation
pub const BM25_K1: f64 = 1.5;
/// Document length normalization
pub const BM25_B: f64 = 0.75;

/// Errors raised while building or querying a lexical index
#[derive(Debug, thiserror::Error)]
pub enum LexicalError {
    #[error("cannot build lexical index for collection '{0}' from an empty candidate set")]
    EmptyCorpus(CollectionId),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// A document handed to the lexical index
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalDocument {
    pub chunk_id: ChunkId,
    pub content: String,
}

impl LexicalDocument {
    pub fn new(chunk_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            content: content.into(),
        }
    }
}

/// A scored position in the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    /// Position of the document in the build input
    pub position: usize,
    pub raw_score: f64,
}

/// In-memory BM25 index
#[derive(Debug)]
pub struct LexicalIndex {
    collection: CollectionId,
    documents: Vec<LexicalDocument>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f64,
    doc_freqs: HashMap<String, usize>,
    analyzer: Arc<dyn TextAnalyzer>,
}

impl LexicalIndex {
    /// Build an index over `documents`, keeping their order as positions
    pub fn build(
        collection: impl Into<CollectionId>,
        documents: Vec<LexicalDocument>,
        analyzer: Arc<dyn TextAnalyzer>,
    ) -> Result<Self, LexicalError> {
        let collection = collection.into();
        if documents.is_empty() {
            return Err(LexicalError::EmptyCorpus(collection));
        }

        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for doc in &documents {
            let terms = analyzer.analyze(&doc.content)?;
            doc_lengths.push(terms.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *freqs.entry(term).or_default() += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(freqs);
        }

        let total: usize = doc_lengths.iter().sum();
        let avg_doc_length = total as f64 / documents.len() as f64;

        debug_assert_eq!(documents.len(), term_freqs.len());
        debug_assert_eq!(documents.len(), doc_lengths.len());

        debug!(
            "Built lexical index for '{}': {} documents, {} terms",
            collection,
            documents.len(),
            doc_freqs.len()
        );

        Ok(Self {
            collection,
            documents,
            term_freqs,
            doc_lengths,
            avg_doc_length,
            doc_freqs,
            analyzer,
        })
    }

    /// Score `query` against every document.
    ///
    /// Returns hits with a positive score, highest first, at most `top_k`.
    /// Equal scores keep build order.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<LexicalHit>, LexicalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_terms = self.analyzer.analyze(query)?;
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<LexicalHit> = (0..self.documents.len())
            .map(|position| LexicalHit {
                position,
                raw_score: self.score(position, &query_terms),
            })
            .filter(|hit| hit.raw_score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
        hits.truncate(top_k);

        debug!(
            "Lexical search in '{}': {} of {} documents matched",
            self.collection,
            hits.len(),
            self.documents.len()
        );

        Ok(hits)
    }

    fn score(&self, position: usize, query_terms: &[String]) -> f64 {
        let freqs = &self.term_freqs[position];
        let length_ratio = if self.avg_doc_length > 0.0 {
            self.doc_lengths[position] as f64 / self.avg_doc_length
        } else {
            1.0
        };
        let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = f64::from(*freqs.get(term)?);
                Some(self.idf(term) * tf * (BM25_K1 + 1.0) / (tf + norm))
            })
            .sum()
    }

    /// Non-negative inverse document frequency
    fn idf(&self, term: &str) -> f64 {
        let n = self.doc_freqs.get(term).copied().unwrap_or(0) as f64;
        let total = self.documents.len() as f64;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document at a build position
    pub fn document(&self, position: usize) -> Option<&LexicalDocument> {
        self.documents.get(position)
    }

    pub fn chunk_id(&self, position: usize) -> Option<&str> {
        self.documents.get(position).map(|d| d.chunk_id.as_str())
    }
}
