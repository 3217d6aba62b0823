use std::collections::BTreeMap;

use super::stopwords::TermSet;

/// Bag-of-words cosine similarity between a query and a document.
///
/// Pure term-frequency vectors: no IDF, no smoothing. Scores are in [0.0, 1.0].
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    stopwords: TermSet,
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        Self::new(TermSet::english_stopwords())
    }
}

impl SimilarityRanker {
    pub fn new(stopwords: TermSet) -> Self {
        Self { stopwords }
    }

    /// Lowercase, split on whitespace, strip non-alphanumeric characters, drop stopwords.
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(|raw| raw.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .filter(|t| !t.is_empty() && !self.stopwords.contains(t))
            .collect()
    }

    /// Sorted term-frequency vector so that every sum below runs in the same order.
    fn term_frequencies(&self, text: &str) -> BTreeMap<String, u64> {
        let mut tf = BTreeMap::new();
        for token in self.tokenize(text) {
            *tf.entry(token).or_insert(0u64) += 1;
        }
        tf
    }

    /// Cosine similarity of the two term-frequency vectors.
    ///
    /// Returns 0.0 when either side is empty after tokenization. Dot product and
    /// magnitudes are integer sums, so the score is symmetric and a non-empty
    /// text scores exactly 1.0 against itself.
    pub fn similarity(&self, query: &str, document: &str) -> f64 {
        let q = self.term_frequencies(query);
        let d = self.term_frequencies(document);
        if q.is_empty() || d.is_empty() {
            return 0.0;
        }

        let dot: u64 = q
            .iter()
            .filter_map(|(term, qc)| d.get(term).map(|dc| qc * dc))
            .sum();
        let q_norm: u64 = q.values().map(|c| c * c).sum();
        let d_norm: u64 = d.values().map(|c| c * c).sum();

        let denominator = ((q_norm as f64) * (d_norm as f64)).sqrt();
        if denominator == 0.0 {
            return 0.0;
        }
        sanitize(dot as f64 / denominator)
    }

    /// Scores one query against many documents, keeping input order.
    pub fn score_all<S: AsRef<str>>(&self, query: &str, documents: &[S]) -> Vec<f64> {
        documents
            .iter()
            .map(|doc| self.similarity(query, doc.as_ref()))
            .collect()
    }
}

/// NaN and out-of-range values never leave this module.
pub fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Similarity with the default English stopword set.
pub fn cosine_similarity(query: &str, document: &str) -> f64 {
    SimilarityRanker::default().similarity(query, document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let ranker = SimilarityRanker::default();
        let tokens = ranker.tokenize("Hello, World! This is a Test-case.");
        assert_eq!(tokens, vec!["hello", "world", "testcase"]);
    }

    #[test]
    fn identical_text_scores_one() {
        let text = "iso camera sensor iso calibration";
        assert_eq!(cosine_similarity(text, text), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "quality management iso standard";
        let b = "the iso standard for quality audits and management reviews";
        assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
        let s = cosine_similarity(a, b);
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn empty_or_stopword_only_inputs_score_zero() {
        assert_eq!(cosine_similarity("", "anything at all"), 0.0);
        assert_eq!(cosine_similarity("anything", ""), 0.0);
        assert_eq!(cosine_similarity("the of and", "the of and"), 0.0);
    }

    #[test]
    fn disjoint_vocabularies_score_zero() {
        assert_eq!(cosine_similarity("camera sensor", "tea ceremony"), 0.0);
    }

    #[test]
    fn extra_stopwords_are_respected() {
        let mut stop = TermSet::english_stopwords();
        stop.extend(["iso"]);
        let ranker = SimilarityRanker::new(stop);
        assert_eq!(ranker.similarity("iso", "iso iso"), 0.0);
    }

    #[test]
    fn sanitize_coerces_nan() {
        assert_eq!(sanitize(f64::NAN), 0.0);
        assert_eq!(sanitize(1.5), 1.0);
    }
}
