use std::collections::{BTreeMap, HashSet};

use crate::nlp::keywords::canonical_keyword;

/// Weight applied to keywords the context never heard of.
pub const DEFAULT_KEYWORD_WEIGHT: u32 = 1;

/// Per-call query state: what the user asked for, how much each term counts,
/// and what round 1 taught us.
///
/// Weights are keyed by canonical keyword; membership tests are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    original_keywords: Vec<String>,
    keyword_weights: BTreeMap<String, u32>,
    derived_keywords: Vec<String>,
}

impl QueryContext {
    /// Original keywords in user order, de-duplicated case-insensitively, all at `weight`.
    pub fn new<I, S>(keywords: I, weight: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ctx = Self::default();
        let mut seen = HashSet::new();
        for keyword in keywords {
            let trimmed = keyword.as_ref().trim();
            let key = canonical_keyword(trimmed);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            ctx.original_keywords.push(trimmed.to_string());
            ctx.keyword_weights.insert(key, weight.max(1));
        }
        ctx
    }

    /// A context whose originals carry explicit per-keyword weights.
    pub fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut ctx = Self::default();
        for (keyword, weight) in weights {
            let trimmed = keyword.as_ref().trim();
            let key = canonical_keyword(trimmed);
            if key.is_empty() || ctx.keyword_weights.contains_key(&key) {
                continue;
            }
            ctx.original_keywords.push(trimmed.to_string());
            ctx.keyword_weights.insert(key, weight.max(1));
        }
        ctx
    }

    /// Adds organization-bias terms at the default weight unless already weighted.
    pub fn with_bias_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            let key = canonical_keyword(term.as_ref());
            if !key.is_empty() {
                self.keyword_weights
                    .entry(key)
                    .or_insert(DEFAULT_KEYWORD_WEIGHT);
            }
        }
        self
    }

    /// Round-2 context: same originals and weights plus `derived` at `weight`.
    ///
    /// Derived terms never override an existing weight.
    pub fn expanded<S: AsRef<str>>(&self, derived: &[S], weight: u32) -> Self {
        let mut next = self.clone();
        for term in derived {
            let key = canonical_keyword(term.as_ref());
            if key.is_empty() || next.is_known(&key) {
                continue;
            }
            next.derived_keywords.push(key.clone());
            next.keyword_weights.entry(key).or_insert(weight.max(1));
        }
        next
    }

    pub fn original_keywords(&self) -> &[String] {
        &self.original_keywords
    }

    pub fn derived_keywords(&self) -> &[String] {
        &self.derived_keywords
    }

    pub fn weight_of(&self, keyword: &str) -> u32 {
        self.keyword_weights
            .get(&canonical_keyword(keyword))
            .copied()
            .unwrap_or(DEFAULT_KEYWORD_WEIGHT)
    }

    /// Every weighted keyword; these are the keys counted on each page.
    pub fn counting_keywords(&self) -> Vec<String> {
        self.keyword_weights.keys().cloned().collect()
    }

    /// `true` if `term` is an original or derived keyword, ignoring case.
    pub fn is_known(&self, term: &str) -> bool {
        let key = canonical_keyword(term);
        self.original_keywords
            .iter()
            .chain(self.derived_keywords.iter())
            .any(|k| canonical_keyword(k) == key)
    }

    /// Lower-cased originals plus derived terms.
    pub fn known_terms(&self) -> HashSet<String> {
        self.original_keywords
            .iter()
            .chain(self.derived_keywords.iter())
            .map(|k| canonical_keyword(k))
            .collect()
    }

    /// Text sent to the search provider: originals, then `extra`, space-joined.
    pub fn query_text<S: AsRef<str>>(&self, extra: &[S]) -> String {
        self.original_keywords
            .iter()
            .map(String::as_str)
            .chain(extra.iter().map(|s| s.as_ref()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Splits raw user input into keywords.
///
/// Spaces and commas separate keywords except inside double quotes, where
/// they are kept so `"camera iso" sensor` yields `camera iso` and `sensor`.
pub fn parse_keywords(input: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                flush(&mut current, &mut keywords);
            }
            ',' | ' ' | '\t' | '\n' if !in_quotes => flush(&mut current, &mut keywords),
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut keywords);
    keywords
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_phrases() {
        assert_eq!(
            parse_keywords(r#""camera iso" sensor, calibration"#),
            vec!["camera iso", "sensor", "calibration"]
        );
        assert_eq!(parse_keywords("  ,, "), Vec::<String>::new());
        assert_eq!(parse_keywords(r#"iso "unterminated phrase"#), vec!["iso", "unterminated phrase"]);
    }

    #[test]
    fn originals_dedupe_case_insensitively_in_user_order() {
        let ctx = QueryContext::new(["ISO", "camera", "iso", " ", "Camera "], 10);
        assert_eq!(ctx.original_keywords(), ["ISO", "camera"]);
        assert_eq!(ctx.weight_of("iso"), 10);
        assert_eq!(ctx.weight_of("CAMERA"), 10);
    }

    #[test]
    fn bias_terms_default_to_weight_one_without_overriding() {
        let ctx = QueryContext::new(["organization"], 10).with_bias_terms(["international", "organization"]);
        assert_eq!(ctx.weight_of("international"), 1);
        assert_eq!(ctx.weight_of("organization"), 10);
        assert_eq!(ctx.weight_of("never-seen"), DEFAULT_KEYWORD_WEIGHT);
    }

    #[test]
    fn expansion_skips_known_terms_and_keeps_original_weights() {
        let ctx = QueryContext::new(["iso", "camera"], 10);
        let next = ctx.expanded(&["Sensor", "ISO", "sensor", "exposure"], 5);
        assert_eq!(next.derived_keywords(), ["sensor", "exposure"]);
        assert_eq!(next.weight_of("iso"), 10);
        assert_eq!(next.weight_of("sensor"), 5);
        assert!(next.is_known("EXPOSURE"));
        assert!(ctx.derived_keywords().is_empty());
    }

    #[test]
    fn query_text_appends_extra_terms() {
        let ctx = QueryContext::new(["iso", "camera"], 10);
        assert_eq!(ctx.query_text(&["sensor"]), "iso camera sensor");
        assert_eq!(ctx.query_text::<&str>(&[]), "iso camera");
    }
}
