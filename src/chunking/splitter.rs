//! Recursive, token-bounded document splitting

use super::tokenizer::{SimpleTokenizer, TokenCounter};
use crate::config::ChunkingConfig;
use crate::types::{chunk_id_for, Chunk, Document};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Byte layout of one chunk within its source text
///
/// `start..body_start` is the overlap prefix repeated from the previous chunk,
/// `body_start..end` is the new text. Bodies of consecutive chunks tile the
/// source without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub body_start: usize,
    pub end: usize,
}

impl ChunkSpan {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        &source[self.body_start..self.end]
    }

    pub fn overlap<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.body_start]
    }
}

/// Split `text` into overlapping chunks of at most `max_size` tokens.
///
/// `separators` are tried coarse to fine; an empty separator splits at
/// grapheme boundaries and is appended when missing.
pub fn split_spans(
    text: &str,
    max_size: usize,
    overlap: usize,
    separators: &[String],
    counter: &dyn TokenCounter,
) -> Vec<ChunkSpan> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if counter.count(text) <= max_size {
        return vec![ChunkSpan {
            start: 0,
            body_start: 0,
            end: text.len(),
        }];
    }

    let separators = normalize_separators(separators);
    // Leave room for the prefix so prefixed chunks still fit in max_size
    let budget = max_size.saturating_sub(overlap).max(1);

    let mut bodies = Vec::new();
    pack(text, 0..text.len(), &separators, budget, counter, &mut bodies);
    let bodies = absorb_blank_bodies(text, bodies);

    let mut spans = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.iter().enumerate() {
        let start = if i == 0 || overlap == 0 {
            body.start
        } else {
            let prev = &bodies[i - 1];
            prev.start + counter.tail_start(&text[prev.clone()], overlap)
        };
        spans.push(ChunkSpan {
            start,
            body_start: body.start,
            end: body.end,
        });
    }
    spans
}

fn normalize_separators(separators: &[String]) -> Vec<&str> {
    let mut seps: Vec<&str> = separators.iter().map(String::as_str).collect();
    if seps.last() != Some(&"") {
        seps.retain(|s| !s.is_empty());
        seps.push("");
    }
    seps
}

/// Greedily pack pieces of `range` under `budget`, recursing into pieces that
/// are too large on their own with the next finer separator.
fn pack(
    text: &str,
    range: Range<usize>,
    separators: &[&str],
    budget: usize,
    counter: &dyn TokenCounter,
    out: &mut Vec<Range<usize>>,
) {
    let Some((separator, finer)) = separators.split_first() else {
        // Indivisible: emit verbatim
        out.push(range);
        return;
    };

    let mut current: Option<Range<usize>> = None;
    for piece in split_keep_separator(text, range, separator) {
        if let Some(cur) = current.take() {
            let merged = cur.start..piece.end;
            if counter.count(&text[merged.clone()]) <= budget {
                current = Some(merged);
                continue;
            }
            out.push(cur);
        }

        if counter.count(&text[piece.clone()]) <= budget {
            current = Some(piece);
        } else {
            pack(text, piece, finer, budget, counter, out);
        }
    }

    if let Some(cur) = current {
        out.push(cur);
    }
}

/// Split `range` after every occurrence of `separator`, keeping the separator
/// at the end of its piece. The pieces tile `range` exactly.
fn split_keep_separator(text: &str, range: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let base = range.start;
    let slice = &text[range.clone()];

    if separator.is_empty() {
        return slice
            .grapheme_indices(true)
            .map(|(i, g)| base + i..base + i + g.len())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (i, m) in slice.match_indices(separator) {
        let end = i + m.len();
        pieces.push(base + last..base + end);
        last = end;
    }
    if last < slice.len() {
        pieces.push(base + last..range.end);
    }
    pieces
}

/// Fold whitespace-only bodies into their predecessor, or into the next body
/// when they lead the text
fn absorb_blank_bodies(text: &str, bodies: Vec<Range<usize>>) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(bodies.len());
    let mut leading: Option<usize> = None;
    for body in bodies {
        let blank = text[body.clone()].trim().is_empty();
        match merged.last_mut() {
            Some(prev) if blank => prev.end = body.end,
            None if blank => {
                leading.get_or_insert(body.start);
            }
            _ => merged.push(leading.take().unwrap_or(body.start)..body.end),
        }
    }
    merged
}

/// Text splitter producing chunk records from documents
pub struct TextSplitter {
    config: ChunkingConfig,
    counter: Arc<dyn TokenCounter>,
}

impl TextSplitter {
    /// Create a splitter counting Unicode words
    pub fn new(config: ChunkingConfig) -> Self {
        Self::with_counter(config, Arc::new(SimpleTokenizer))
    }

    /// Create a splitter with a custom token counter
    pub fn with_counter(config: ChunkingConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    /// Create a splitter from configuration, loading the configured tokenizer
    pub fn from_config(config: ChunkingConfig) -> anyhow::Result<Self> {
        match &config.tokenizer_path {
            #[cfg(feature = "hf-tokenizer")]
            Some(path) => {
                let counter = super::tokenizer::HfTokenCounter::from_file(path)?;
                Ok(Self::with_counter(config, Arc::new(counter)))
            }
            #[cfg(not(feature = "hf-tokenizer"))]
            Some(path) => {
                warn!(
                    "tokenizer_path {} ignored: built without the hf-tokenizer feature",
                    path.display()
                );
                Ok(Self::new(config))
            }
            None => Ok(Self::new(config)),
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk layout of `text`
    pub fn split_with_spans(&self, text: &str) -> Vec<ChunkSpan> {
        split_spans(
            text,
            self.config.chunk_size,
            self.config.chunk_overlap,
            &self.config.separators,
            self.counter.as_ref(),
        )
    }

    /// Split text into chunk strings, overlap included
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with_spans(text)
            .iter()
            .map(|span| span.text(text).to_string())
            .collect()
    }

    /// Token count of `text` under this splitter's counter
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Split a document into chunk records
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(index, content)| Chunk {
                chunk_id: chunk_id_for(&document.id, index),
                doc_id: document.id.clone(),
                index,
                content,
                source_filename: document.filename.clone(),
                metadata: document.metadata.clone(),
            })
            .collect();

        debug!(
            "Split document {} ({}) into {} chunks",
            document.id,
            document.filename,
            chunks.len()
        );

        chunks
    }
}
