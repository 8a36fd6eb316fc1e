//! Score normalization and linear fusion of semantic and lexical results

use crate::types::{ChunkId, ScoredCandidate, VectorHit};
use std::collections::{HashMap, HashSet};

/// Min-max scale scores into [0, 1], preserving order and length.
///
/// All-equal input (including a single score) maps to `1.0`. Non-finite
/// scores map to `0.0` and are ignored when finding the range.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let finite = scores.iter().copied().filter(|s| s.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });
    let range = max - min;

    scores
        .iter()
        .map(|&s| {
            if !s.is_finite() {
                0.0
            } else if range > 0.0 {
                ((s - min) / range).clamp(0.0, 1.0)
            } else {
                1.0
            }
        })
        .collect()
}

/// A lexical hit resolved to its chunk
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch {
    pub chunk_id: ChunkId,
    pub raw_score: f64,
}

/// Bookkeeping from one fusion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub candidates: usize,
    pub lexical_hits: usize,
    /// Lexical hits whose chunk_id is not among the vector candidates
    pub unmatched_lexical: usize,
}

impl FusionStats {
    /// Share of lexical hits that could not be aligned with a candidate
    pub fn mismatch_rate(&self) -> f64 {
        if self.lexical_hits == 0 {
            0.0
        } else {
            self.unmatched_lexical as f64 / self.lexical_hits as f64
        }
    }
}

/// Drop repeated chunk_ids, keeping the first (best ranked) occurrence.
///
/// Returns the unique hits and the number removed.
pub fn dedup_by_chunk_id(hits: Vec<VectorHit>) -> (Vec<VectorHit>, usize) {
    let before = hits.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<VectorHit> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.chunk_id.clone()))
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

/// Combine normalized vector and lexical scores:
/// `alpha * vector + (1 - alpha) * lexical`.
///
/// Vector scores are normalized across all candidates, lexical scores across
/// the lexical hits only; a candidate without a lexical hit gets 0. Output is
/// sorted descending, ties keep candidate order.
pub fn linear_combination(
    candidates: Vec<VectorHit>,
    lexical: &[LexicalMatch],
    alpha: f64,
) -> (Vec<ScoredCandidate>, FusionStats) {
    let lexical: Vec<&LexicalMatch> = lexical.iter().filter(|m| !m.chunk_id.is_empty()).collect();
    let lexical_norm = normalize(&lexical.iter().map(|m| m.raw_score).collect::<Vec<_>>());

    let mut lexical_scores: HashMap<&str, f64> = HashMap::with_capacity(lexical.len());
    for (m, norm) in lexical.iter().zip(lexical_norm) {
        lexical_scores.entry(m.chunk_id.as_str()).or_insert(norm);
    }

    let candidate_ids: HashSet<&str> = candidates.iter().map(|c| c.chunk_id.as_str()).collect();
    let stats = FusionStats {
        candidates: candidates.len(),
        lexical_hits: lexical_scores.len(),
        unmatched_lexical: lexical_scores
            .keys()
            .filter(|id| !candidate_ids.contains(*id))
            .count(),
    };

    let vector_norm = normalize(&candidates.iter().map(|c| c.score).collect::<Vec<_>>());
    let lexical_for: Vec<f64> = candidates
        .iter()
        .map(|c| lexical_scores.get(c.chunk_id.as_str()).copied().unwrap_or(0.0))
        .collect();

    let mut fused: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(vector_norm)
        .zip(lexical_for)
        .map(|((hit, nv), nl)| ScoredCandidate {
            chunk_id: hit.chunk_id,
            content: hit.content,
            score: alpha * nv + (1.0 - alpha) * nl,
            vector_score: nv,
            lexical_score: nl,
            rerank_score: None,
            metadata: hit.metadata,
        })
        .collect();

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    (fused, stats)
}

/// Vector-only ranking with normalized vector scores and no lexical signal
pub fn vector_only(candidates: Vec<VectorHit>) -> Vec<ScoredCandidate> {
    let vector_norm = normalize(&candidates.iter().map(|c| c.score).collect::<Vec<_>>());
    let mut ranked: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(vector_norm)
        .map(|(hit, nv)| ScoredCandidate {
            chunk_id: hit.chunk_id,
            content: hit.content,
            score: nv,
            vector_score: nv,
            lexical_score: 0.0,
            rerank_score: None,
            metadata: hit.metadata,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Drop candidates scoring below `threshold`, then keep the first `top_k`
pub fn apply_threshold(
    mut candidates: Vec<ScoredCandidate>,
    threshold: Option<f64>,
    top_k: usize,
) -> Vec<ScoredCandidate> {
    if let Some(threshold) = threshold {
        candidates.retain(|c| c.score >= threshold);
    }
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn hit(chunk_id: &str, score: f64) -> VectorHit {
        VectorHit {
            chunk_id: chunk_id.to_string(),
            content: format!("content of {}", chunk_id),
            score,
            metadata: Metadata::new(),
        }
    }

    fn lex(chunk_id: &str, raw_score: f64) -> LexicalMatch {
        LexicalMatch {
            chunk_id: chunk_id.to_string(),
            raw_score,
        }
    }

    #[test]
    fn test_normalize_edge_cases() {
        assert_eq!(normalize(&[5.0]), vec![1.0]);
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![1.0, 1.0, 1.0]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_normalize_min_max() {
        assert_eq!(normalize(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(normalize(&[-1.0, 1.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn test_normalize_bounds_and_order() {
        let input = [0.91, 0.13, 12.5, -3.0, 7.25, 0.0, 0.91];
        let output = normalize(&input);
        assert_eq!(output.len(), input.len());
        for value in &output {
            assert!((0.0..=1.0).contains(value));
        }
        for i in 0..input.len() {
            for j in 0..input.len() {
                if input[i] < input[j] {
                    assert!(output[i] < output[j]);
                }
            }
        }
    }

    #[test]
    fn test_normalize_non_finite_inputs() {
        let output = normalize(&[f64::NAN, 1.0, 3.0, f64::INFINITY]);
        assert_eq!(output, vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(normalize(&[f64::NAN]), vec![0.0]);
    }

    #[test]
    fn test_linear_combination_formula() {
        let candidates = vec![hit("a", 0.9), hit("b", 0.6), hit("c", 0.3)];
        let lexical = vec![lex("c", 8.0), lex("b", 2.0)];
        let alpha = 0.7;
        let (fused, stats) = linear_combination(candidates, &lexical, alpha);

        let expected: HashMap<&str, (f64, f64)> =
            [("a", (1.0, 0.0)), ("b", (0.5, 0.0)), ("c", (0.0, 1.0))].into_iter().collect();
        for candidate in &fused {
            let (nv, nl) = expected[candidate.chunk_id.as_str()];
            assert!((candidate.vector_score - nv).abs() < 1e-9);
            assert!((candidate.lexical_score - nl).abs() < 1e-9);
            assert!((candidate.score - (alpha * nv + (1.0 - alpha) * nl)).abs() < 1e-9);
        }
        assert_eq!(
            fused.iter().map(|c| c.chunk_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(stats.lexical_hits, 2);
        assert_eq!(stats.unmatched_lexical, 0);
    }

    #[test]
    fn test_single_lexical_hit_normalizes_to_one() {
        let (fused, _) = linear_combination(vec![hit("a", 0.5), hit("b", 0.5)], &[lex("b", 0.2)], 0.7);
        assert_eq!(fused[0].chunk_id, "b");
        assert!((fused[0].score - 1.0).abs() < 1e-9);
        assert!((fused[1].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let candidates = vec![hit("first", 0.4), hit("second", 0.4), hit("third", 0.4)];
        let (fused, _) = linear_combination(candidates, &[], 0.7);
        assert_eq!(
            fused.iter().map(|c| c.chunk_id.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_alpha_extremes() {
        let candidates = vec![hit("a", 0.9), hit("b", 0.1)];
        let lexical = vec![lex("b", 3.0)];

        let (vector_only, _) = linear_combination(candidates.clone(), &lexical, 1.0);
        assert_eq!(vector_only[0].chunk_id, "a");

        let (lexical_only, _) = linear_combination(candidates, &lexical, 0.0);
        assert_eq!(lexical_only[0].chunk_id, "b");
        assert!((lexical_only[1].score - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_lexical_ids_are_counted() {
        let (fused, stats) =
            linear_combination(vec![hit("a", 0.9)], &[lex("a", 1.0), lex("ghost", 2.0)], 0.5);
        assert_eq!(fused.len(), 1);
        assert_eq!(stats.unmatched_lexical, 1);
        assert!((stats.mismatch_rate() - 0.5).abs() < 1e-9);
        // normalized over both hits: a -> 0.0
        assert!((fused[0].lexical_score - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_chunk_ids_ignored_in_lexical() {
        let (fused, stats) = linear_combination(vec![hit("a", 0.9)], &[lex("", 5.0)], 0.5);
        assert_eq!(stats.lexical_hits, 0);
        assert_eq!(fused[0].lexical_score, 0.0);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let (unique, removed) = dedup_by_chunk_id(vec![hit("a", 0.9), hit("b", 0.8), hit("a", 0.7)]);
        assert_eq!(removed, 1);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].score, 0.9);
    }

    #[test]
    fn test_vector_only_normalizes() {
        let ranked = vector_only(vec![hit("a", 0.2), hit("b", 0.8), hit("c", 0.5)]);
        assert_eq!(ranked[0].chunk_id, "b");
        assert_eq!(ranked[0].score, 1.0);
        assert_eq!(ranked[2].chunk_id, "a");
        assert_eq!(ranked[2].vector_score, 0.0);
        assert!(ranked.iter().all(|c| c.lexical_score == 0.0));
    }

    #[test]
    fn test_apply_threshold_and_truncate() {
        let (fused, _) = linear_combination(
            vec![hit("a", 0.9), hit("b", 0.5), hit("c", 0.1)],
            &[],
            0.7,
        );
        let kept = apply_threshold(fused.clone(), Some(0.3), 10);
        assert_eq!(kept.len(), 2);
        let kept = apply_threshold(fused.clone(), None, 1);
        assert_eq!(kept.len(), 1);
        assert!(apply_threshold(fused, Some(0.9), 10).is_empty());
    }
}
