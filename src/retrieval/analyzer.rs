//! Text analysis for lexical scoring

use jieba_rs::Jieba;
use std::fmt::Debug;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Errors raised while turning text into index terms
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Analyzer failed: {0}")]
    Failed(String),
}

/// Turns text into the terms used by the lexical index
///
/// Queries and documents must go through the same analyzer.
pub trait TextAnalyzer: Send + Sync + Debug {
    fn analyze(&self, text: &str) -> Result<Vec<String>, AnalyzerError>;
}

/// Lower-cased UAX #29 words, with dictionary segmentation for scripts written
/// without spaces
///
/// Runs of Han text go through jieba's search-mode cut, which yields dictionary
/// words and their dictionary sub-words but never a span crossing a word
/// boundary. Characters jieba has no dictionary for (kana, Thai, Khmer, ...)
/// come back one per term.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeAnalyzer;

static SEGMENTER: OnceLock<Jieba> = OnceLock::new();

fn segmenter() -> &'static Jieba {
    SEGMENTER.get_or_init(Jieba::new)
}

impl TextAnalyzer for UnicodeAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<String>, AnalyzerError> {
        let mut terms = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut offset = 0;

        for segment in text.split_word_bounds() {
            let start = offset;
            offset += segment.len();

            if segment.chars().all(is_unsegmented) {
                run_start.get_or_insert(start);
                continue;
            }
            if let Some(run) = run_start.take() {
                push_segmented(&text[run..start], &mut terms);
            }
            if segment.chars().any(char::is_alphanumeric) {
                terms.push(segment.to_lowercase());
            }
        }
        if let Some(run) = run_start {
            push_segmented(&text[run..], &mut terms);
        }

        Ok(terms)
    }
}

fn push_segmented(run: &str, terms: &mut Vec<String>) {
    terms.extend(
        segmenter()
            .cut_for_search(run, true)
            .into_iter()
            .filter(|word| word.chars().any(char::is_alphanumeric))
            .map(str::to_lowercase),
    );
}

/// Letters of scripts that do not separate words with spaces
fn is_unsegmented(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'     // Hiragana
        | '\u{30A0}'..='\u{30FF}'   // Katakana
        | '\u{3400}'..='\u{4DBF}'   // CJK Extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{F900}'..='\u{FAFF}'   // CJK Compatibility Ideographs
        | '\u{20000}'..='\u{2FA1F}' // CJK Extensions B-F, supplement
        | '\u{0E00}'..='\u{0E7F}'   // Thai
        | '\u{0E80}'..='\u{0EFF}'   // Lao
        | '\u{1000}'..='\u{109F}'   // Myanmar
        | '\u{1780}'..='\u{17FF}'   // Khmer
    )
}
