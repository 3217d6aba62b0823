//! Keyword occurrence counting.
//!
//! Counting uses word boundaries for Latin-script keywords ("iso" does not
//! match inside "isolate") and plain non-overlapping substring matching for
//! keywords containing Han, Hiragana or Katakana characters, where words are
//! not space-delimited.

use aho_corasick::AhoCorasick;
use regex::Regex;
use tracing::debug;

use super::script::{contains_cjk, is_word_char};
use crate::core::types::KeywordCounts;

/// Canonical form of a keyword used as a map key: trimmed and lower-cased.
pub fn canonical_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

/// How one keyword is located in lower-cased text.
#[derive(Debug, Clone)]
enum Matcher {
    Bounded(Regex),
    Substring(AhoCorasick),
    /// The keyword could not be compiled; it always counts 0.
    Never,
}

impl Matcher {
    fn build(key: &str) -> Self {
        let built = if contains_cjk(key) {
            AhoCorasick::new([key])
                .map(Matcher::Substring)
                .map_err(|e| e.to_string())
        } else {
            boundary_pattern(key)
                .map(Matcher::Bounded)
                .map_err(|e| e.to_string())
        };
        built.unwrap_or_else(|e| {
            debug!("matcher rejected keyword {:?}: {}", key, e);
            Matcher::Never
        })
    }

    fn count(&self, haystack: &str) -> u32 {
        match self {
            Matcher::Bounded(re) => re.find_iter(haystack).count() as u32,
            Matcher::Substring(ac) => ac.find_iter(haystack).count() as u32,
            Matcher::Never => 0,
        }
    }
}

/// Compiled matchers for a fixed keyword list, reusable across pages.
///
/// Blank keywords are skipped and duplicates (after case folding) collapse to
/// one key. Every remaining keyword is present in each result, with 0 when it
/// does not occur or when the text is empty.
#[derive(Debug, Clone, Default)]
pub struct KeywordCounter {
    matchers: Vec<(String, Matcher)>,
}

impl KeywordCounter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut matchers: Vec<(String, Matcher)> = Vec::new();
        for keyword in keywords {
            let key = canonical_keyword(keyword.as_ref());
            if key.is_empty() || matchers.iter().any(|(k, _)| *k == key) {
                continue;
            }
            let matcher = Matcher::build(&key);
            matchers.push((key, matcher));
        }
        Self { matchers }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn count(&self, text: &str) -> KeywordCounts {
        let haystack = text.to_lowercase();
        self.matchers
            .iter()
            .map(|(key, matcher)| {
                let n = if haystack.is_empty() { 0 } else { matcher.count(&haystack) };
                (key.clone(), n)
            })
            .collect()
    }
}

/// Counts every requested keyword in `text` with a one-off [`KeywordCounter`].
pub fn count_keywords<S: AsRef<str>>(text: &str, keywords: &[S]) -> KeywordCounts {
    KeywordCounter::new(keywords).count(text)
}

/// `\b` is only meaningful next to a word character, so it is added per side.
fn boundary_pattern(needle: &str) -> Result<Regex, regex::Error> {
    let starts_word = needle.chars().next().is_some_and(is_word_char);
    let ends_word = needle.chars().last().is_some_and(is_word_char);
    let mut pattern = String::with_capacity(needle.len() + 8);
    if starts_word {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(needle));
    if ends_word {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_maps_every_keyword_to_zero() {
        let counts = count_keywords("", &["iso", "standard", "标准"]);
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 0));
    }

    #[test]
    fn counts_case_insensitively() {
        let counts = count_keywords("ISO standard ISO", &["iso", "Standard"]);
        assert_eq!(counts["iso"], 2);
        assert_eq!(counts["standard"], 1);
    }

    #[test]
    fn latin_keywords_respect_word_boundaries() {
        let counts = count_keywords("isolate the iso isotope", &["iso"]);
        assert_eq!(counts["iso"], 1);
    }

    #[test]
    fn cjk_keywords_match_inside_runs() {
        let counts = count_keywords("国际标准化组织发布标准", &["标准"]);
        assert_eq!(counts["标准"], 2);
    }

    #[test]
    fn blanks_and_duplicates_are_collapsed() {
        let counts = count_keywords("iso", &["iso", " ", "", "ISO "]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["iso"], 1);
    }

    #[test]
    fn multi_word_phrase_counts_whole_phrase() {
        let counts = count_keywords("camera iso setting and camera isolation", &["camera iso"]);
        assert_eq!(counts["camera iso"], 1);
    }

    #[test]
    fn counter_is_reused_across_texts() {
        let counter = KeywordCounter::new(&["iso", "ISO", " ", "标准"]);
        assert_eq!(counter.len(), 2);
        let first = counter.count("ISO 9001 is an iso standard");
        let second = counter.count("国家标准 and nothing else");
        assert_eq!(first["iso"], 2);
        assert_eq!(first["标准"], 0);
        assert_eq!(second["iso"], 0);
        assert_eq!(second["标准"], 1);
    }

    #[test]
    fn keyword_with_symbol_edges_still_matches() {
        let counts = count_keywords("learn c++ and c++ fast", &["c++"]);
        assert_eq!(counts["c++"], 2);
    }
}
