use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::keywords::canonical_keyword;
use super::script::is_cjk_char;
use super::stopwords::TermSet;

/// Latin tokens need at least this many characters.
const MIN_LATIN_TOKEN_CHARS: usize = 4;
/// CJK runs are cut into tokens of this many characters.
const CJK_TOKEN_CHARS: usize = 2;
/// Above this many context terms a chunk only needs one of them to be relevant.
const STRICT_CONTEXT_MAX: usize = 2;

/// Mines co-occurring terms from result text to expand a query.
#[derive(Debug, Clone)]
pub struct KeywordDeriver {
    stopwords: TermSet,
    filler: TermSet,
}

impl Default for KeywordDeriver {
    fn default() -> Self {
        Self::new(TermSet::english_stopwords(), TermSet::filler_terms())
    }
}

impl KeywordDeriver {
    pub fn new(stopwords: TermSet, filler: TermSet) -> Self {
        Self { stopwords, filler }
    }

    /// Up to `n` new terms from `text`, most frequent first, ties in order of first appearance.
    ///
    /// Only sentence-like chunks that mention the context are mined: every
    /// context term when there are at most two, any of them otherwise. Filler
    /// terms do not count as context. Terms in `known` (lower-cased) are never
    /// returned. With no relevant chunk, or no usable context, the whole text
    /// is mined under the same exclusions.
    pub fn derive<S: AsRef<str>>(
        &self,
        text: &str,
        n: usize,
        context: &[S],
        known: &HashSet<String>,
    ) -> Vec<String> {
        if n == 0 || text.trim().is_empty() {
            return Vec::new();
        }

        let lower = text.to_lowercase();
        let context_terms: Vec<String> = context
            .iter()
            .map(|c| canonical_keyword(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        let anchors: Vec<&str> = context_terms
            .iter()
            .map(String::as_str)
            .filter(|c| !self.filler.contains(c))
            .collect();

        let excluded = |token: &str| {
            self.stopwords.contains(token)
                || self.filler.contains(token)
                || known.contains(token)
                || context_terms.iter().any(|c| c == token)
        };

        let relevant: Vec<&str> = if anchors.is_empty() {
            Vec::new()
        } else {
            let strict = anchors.len() <= STRICT_CONTEXT_MAX;
            lower
                .split(['.', '!', '?', '\n'])
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .filter(|chunk| {
                    if strict {
                        anchors.iter().all(|a| chunk.contains(a))
                    } else {
                        anchors.iter().any(|a| chunk.contains(a))
                    }
                })
                .collect()
        };

        let sources: Vec<&str> = if relevant.is_empty() {
            debug!("no chunk mentions the query context; mining whole text");
            vec![lower.as_str()]
        } else {
            relevant
        };

        let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
        let mut order = 0usize;
        for source in sources {
            for token in tokenize(source) {
                if excluded(&token) {
                    continue;
                }
                let entry = freq.entry(token).or_insert((0, order));
                entry.0 += 1;
                order += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = freq
            .into_iter()
            .map(|(term, (count, first))| (term, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.into_iter().take(n).map(|(term, _, _)| term).collect()
    }
}

/// Script-aware tokenizer.
///
/// Text splits on anything that is not alphanumeric, then each piece splits
/// again wherever it switches between CJK and non-CJK characters. Latin runs
/// are kept when long enough and digit-free; CJK runs of two or more
/// characters become overlapping two-character tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for piece in text.split(|c: char| !c.is_alphanumeric()) {
        if piece.is_empty() {
            continue;
        }
        let mut run = String::new();
        let mut run_is_cjk = false;
        for c in piece.chars() {
            let cjk = is_cjk_char(c);
            if !run.is_empty() && cjk != run_is_cjk {
                push_run(&run, run_is_cjk, &mut tokens);
                run.clear();
            }
            run_is_cjk = cjk;
            run.push(c);
        }
        push_run(&run, run_is_cjk, &mut tokens);
    }
    tokens
}

fn push_run(run: &str, cjk: bool, tokens: &mut Vec<String>) {
    if cjk {
        let chars: Vec<char> = run.chars().collect();
        if chars.len() < CJK_TOKEN_CHARS {
            return;
        }
        for window in chars.windows(CJK_TOKEN_CHARS) {
            tokens.push(window.iter().collect());
        }
    } else if run.chars().count() >= MIN_LATIN_TOKEN_CHARS
        && !run.chars().any(|c| c.is_ascii_digit() || c.is_numeric())
    {
        tokens.push(run.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn ranks_by_frequency_then_first_appearance() {
        let text = "iso camera sensor calibration. iso camera sensor exposure. iso camera exposure sensor.";
        let derived = KeywordDeriver::default().derive(text, 2, &["iso", "camera"], &none());
        assert_eq!(derived, vec!["sensor", "exposure"]);
    }

    #[test]
    fn strict_context_requires_all_terms() {
        let text = "iso meets camera rigs here.\nonly iso appears alongside tripods.";
        let derived = KeywordDeriver::default().derive(text, 5, &["iso", "camera"], &none());
        assert!(derived.contains(&"meets".to_string()));
        assert!(derived.contains(&"rigs".to_string()));
        assert!(!derived.contains(&"tripods".to_string()));
    }

    #[test]
    fn relaxed_context_accepts_any_term() {
        let text = "lens shading matters.\niso noise grows.\nshutter timing varies.";
        let derived = KeywordDeriver::default().derive(text, 10, &["iso", "shutter", "aperture"], &none());
        assert!(derived.contains(&"noise".to_string()));
        assert!(derived.contains(&"timing".to_string()));
        assert!(!derived.contains(&"shading".to_string()));
    }

    #[test]
    fn excludes_known_stopwords_digits_filler_and_short_tokens() {
        let text = "iso 9001 audit with quality international standards quality audit2 iso camera";
        let known: HashSet<String> = ["audit".to_string()].into_iter().collect();
        let derived = KeywordDeriver::default().derive(text, 10, &["iso"], &known);
        assert_eq!(derived, vec!["quality", "camera"]);
    }

    #[test]
    fn falls_back_to_whole_text_when_nothing_is_relevant() {
        let text = "tripod stability guide. tripod legs and heads.";
        let derived = KeywordDeriver::default().derive(text, 1, &["iso"], &none());
        assert_eq!(derived, vec!["tripod"]);
    }

    #[test]
    fn filler_only_context_mines_whole_text() {
        let text = "committee drafts. committee votes.";
        let derived = KeywordDeriver::default().derive(text, 1, &["international"], &none());
        assert_eq!(derived, vec!["committee"]);
    }

    #[test]
    fn cjk_runs_become_bigrams() {
        let derived = KeywordDeriver::default().derive("标准化 标准", 5, &["iso"], &none());
        assert_eq!(derived, vec!["标准", "准化"]);
    }

    #[test]
    fn zero_requested_terms_returns_nothing() {
        assert!(KeywordDeriver::default().derive("anything goes", 0, &["iso"], &none()).is_empty());
    }
}
