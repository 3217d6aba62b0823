use std::cmp::Ordering;
use tracing::debug;

use super::similarity::sanitize;
use crate::core::types::{RankedResult, RankingMode};

/// Value every candidate gets when a signal is flat across the batch.
pub const DEFAULT_DEGENERATE_VALUE: f64 = 0.5;

/// Blend weights; always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    keyword: f64,
    similarity: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            keyword: 0.6,
            similarity: 0.4,
        }
    }
}

impl HybridWeights {
    /// Negative and non-finite inputs count as 0; both zero falls back to the default split.
    pub fn new(keyword: f64, similarity: f64) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (k, s) = (clean(keyword), clean(similarity));
        let total = k + s;
        if total == 0.0 {
            return Self::default();
        }
        Self {
            keyword: k / total,
            similarity: s / total,
        }
    }

    pub fn keyword(&self) -> f64 {
        self.keyword
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }
}

/// Min-max normalization to [0, 1]; a flat batch maps to `degenerate`.
pub fn min_max_normalize(values: &[f64], degenerate: f64) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() || max == min {
        return vec![degenerate; values.len()];
    }
    let span = max - min;
    values
        .iter()
        .map(|v| if v.is_finite() { ((v - min) / span).clamp(0.0, 1.0) } else { 0.0 })
        .collect()
}

/// Blends normalized keyword and similarity signals into one score in [0, 100].
#[derive(Debug, Clone)]
pub struct HybridScorer {
    weights: HybridWeights,
    degenerate_value: f64,
    mode: RankingMode,
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::new(HybridWeights::default(), DEFAULT_DEGENERATE_VALUE, RankingMode::Hybrid)
    }
}

impl HybridScorer {
    pub fn new(weights: HybridWeights, degenerate_value: f64, mode: RankingMode) -> Self {
        Self {
            weights,
            degenerate_value: sanitize(degenerate_value),
            mode,
        }
    }

    pub fn with_mode(&self, mode: RankingMode) -> Self {
        Self { mode, ..self.clone() }
    }

    pub fn mode(&self) -> RankingMode {
        self.mode
    }

    /// Scores the batch, sorts it descending by the mode's key and assigns 1-based ranks.
    ///
    /// Both normalized values and the combined score are always computed; the
    /// mode only picks the ordering key and the exposed `score`. The sort is
    /// stable, so ties keep discovery order.
    pub fn rank(&self, mut results: Vec<RankedResult>) -> Vec<RankedResult> {
        if results.is_empty() {
            return results;
        }

        let keyword: Vec<f64> = results.iter().map(|r| r.keyword_score as f64).collect();
        let similarity: Vec<f64> = results.iter().map(|r| sanitize(r.similarity)).collect();
        let norm_kw = min_max_normalize(&keyword, self.degenerate_value);
        let norm_sim = min_max_normalize(&similarity, self.degenerate_value);

        for (i, r) in results.iter_mut().enumerate() {
            r.similarity = similarity[i];
            r.normalized_keyword = norm_kw[i];
            r.normalized_similarity = norm_sim[i];
            let combined = 100.0
                * (self.weights.keyword * norm_kw[i] + self.weights.similarity * norm_sim[i]);
            r.combined_score = if combined.is_finite() {
                combined.clamp(0.0, 100.0)
            } else {
                0.0
            };
            r.score = match self.mode {
                RankingMode::Keyword => 100.0 * r.normalized_keyword,
                RankingMode::Similarity => 100.0 * r.normalized_similarity,
                RankingMode::Hybrid => r.combined_score,
            };
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        for (i, r) in results.iter_mut().enumerate() {
            r.rank = i + 1;
        }

        debug!(
            "ranked {} results (mode: {:?}, weights: {:.2}/{:.2})",
            results.len(),
            self.mode,
            self.weights.keyword,
            self.weights.similarity
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchHit;

    fn candidate(url: &str, keyword_score: i64, similarity: f64) -> RankedResult {
        let mut r = RankedResult::unscored(
            SearchHit {
                title: url.to_string(),
                url: url.to_string(),
            },
            0,
        );
        r.keyword_score = keyword_score;
        r.similarity = similarity;
        r
    }

    #[test]
    fn weights_are_renormalized() {
        let w = HybridWeights::new(3.0, 1.0);
        assert_eq!(w.keyword(), 0.75);
        assert_eq!(w.similarity(), 0.25);
        assert_eq!(HybridWeights::new(0.0, 0.0), HybridWeights::default());
        assert_eq!(HybridWeights::new(-1.0, 2.0).similarity(), 1.0);
    }

    #[test]
    fn flat_batches_use_degenerate_constant() {
        assert_eq!(min_max_normalize(&[7.0, 7.0, 7.0], 0.5), vec![0.5, 0.5, 0.5]);
        assert_eq!(min_max_normalize(&[1.0, 3.0, 2.0], 0.5), vec![0.0, 1.0, 0.5]);
        assert!(min_max_normalize(&[], 0.5).is_empty());
    }

    #[test]
    fn higher_similarity_wins_on_equal_keyword_score() {
        let ranked = HybridScorer::default().rank(vec![
            candidate("https://a.example/", 40, 0.2),
            candidate("https://b.example/", 40, 0.8),
        ]);
        assert_eq!(ranked[0].url, "https://b.example/");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        // keyword flat → 0.5 each; similarity normalizes to 1.0 and 0.0
        assert!((ranked[0].combined_score - 70.0).abs() < 1e-9);
        assert!((ranked[1].combined_score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn combined_score_stays_in_range() {
        let ranked = HybridScorer::default().rank(vec![
            candidate("https://a.example/", 0, f64::NAN),
            candidate("https://b.example/", 1_000_000, 1.0),
            candidate("https://c.example/", -5, 0.3),
        ]);
        for r in &ranked {
            assert!((0.0..=100.0).contains(&r.combined_score));
            assert!(!r.similarity.is_nan());
        }
    }

    #[test]
    fn keyword_only_weights_reproduce_keyword_order() {
        let batch = vec![
            candidate("https://a.example/", 3, 0.9),
            candidate("https://b.example/", 9, 0.1),
            candidate("https://c.example/", 5, 0.5),
            candidate("https://d.example/", 5, 0.7),
        ];
        let hybrid = HybridScorer::new(HybridWeights::new(1.0, 0.0), 0.5, RankingMode::Hybrid)
            .rank(batch.clone());
        let keyword = HybridScorer::default()
            .with_mode(RankingMode::Keyword)
            .rank(batch);
        let h: Vec<_> = hybrid.iter().map(|r| r.url.as_str()).collect();
        let k: Vec<_> = keyword.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(h, k);
        assert_eq!(k, ["https://b.example/", "https://c.example/", "https://d.example/", "https://a.example/"]);
    }

    #[test]
    fn mode_selects_exposed_score() {
        let batch = vec![
            candidate("https://a.example/", 10, 0.1),
            candidate("https://b.example/", 2, 0.9),
        ];
        let by_sim = HybridScorer::default()
            .with_mode(RankingMode::Similarity)
            .rank(batch);
        assert_eq!(by_sim[0].url, "https://b.example/");
        assert_eq!(by_sim[0].score, 100.0);
        // combined is computed regardless of mode
        assert!((by_sim[0].combined_score - 40.0).abs() < 1e-9);
    }
}
