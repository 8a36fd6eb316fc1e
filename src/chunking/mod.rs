//! Document chunking
//!
//! Features:
//! - Recursive splitting on paragraph, line, sentence and word boundaries
//! - Token-bounded chunk sizes with token overlap
//! - Pluggable token counting (Unicode words, or a Hugging Face tokenizer)

mod splitter;
mod tokenizer;

pub use splitter::*;
pub use tokenizer::*;
