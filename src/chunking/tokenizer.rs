//! Token counting used to bound chunk sizes

use unicode_segmentation::UnicodeSegmentation;

/// Measures text length in tokens
///
/// Implementations must be deterministic: the same text always yields the
/// same count and the same tail offsets.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Byte offset at which the last `n` tokens of `text` begin.
    ///
    /// Returns `text.len()` when `n == 0` and `0` when `text` has at most `n`
    /// tokens. The returned offset is always a char boundary.
    fn tail_start(&self, text: &str, n: usize) -> usize;
}

/// Word tokenizer for token counting (UAX #29 words)
///
/// Each CJK ideograph is its own word under UAX #29, so unsegmented scripts
/// count per character.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl SimpleTokenizer {
    /// Count tokens in text (word-based approximation)
    pub fn count_tokens(text: &str) -> usize {
        text.unicode_words().count()
    }

    /// Split text into tokens
    pub fn tokenize(text: &str) -> Vec<&str> {
        text.unicode_words().collect()
    }
}

impl TokenCounter for SimpleTokenizer {
    fn count(&self, text: &str) -> usize {
        Self::count_tokens(text)
    }

    fn tail_start(&self, text: &str, n: usize) -> usize {
        if n == 0 {
            return text.len();
        }
        let starts: Vec<usize> = text.unicode_word_indices().map(|(i, _)| i).collect();
        if starts.len() <= n {
            0
        } else {
            starts[starts.len() - n]
        }
    }
}

/// Token counter backed by a Hugging Face `tokenizer.json`
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenCounter {
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenCounter {
    /// Load a tokenizer from a `tokenizer.json` file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let tokenizer = tokenizers::Tokenizer::from_file(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        Ok(Self { tokenizer })
    }

    fn offsets(&self, text: &str) -> Vec<(usize, usize)> {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.get_offsets().to_vec(),
            Err(e) => {
                tracing::warn!("Tokenizer failed, falling back to word count: {}", e);
                text.unicode_word_indices()
                    .map(|(i, w)| (i, i + w.len()))
                    .collect()
            }
        }
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.offsets(text).len()
    }

    fn tail_start(&self, text: &str, n: usize) -> usize {
        if n == 0 {
            return text.len();
        }
        let offsets = self.offsets(text);
        if offsets.len() <= n {
            return 0;
        }
        let mut start = offsets[offsets.len() - n].0.min(text.len());
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        start
    }
}
