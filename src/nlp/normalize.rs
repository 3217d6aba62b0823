use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use super::script::DEFAULT_NON_LATIN_RANGE;

static SCRIPT_STYLE_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();
static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn script_style_re() -> &'static Regex {
    SCRIPT_STYLE_RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid script/style pattern")
    })
}

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag pattern"))
}

fn entity_re() -> &'static Regex {
    ENTITY_RE.get_or_init(|| {
        Regex::new(r"&(?:[a-zA-Z]{2,8}|#[0-9]{1,6}|#x[0-9a-fA-F]{1,6});").expect("valid entity pattern")
    })
}

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"))
}

/// Turns raw markup (or transcript text) into lower-cased, searchable plain text.
///
/// Only ASCII letters and digits, spaces, and characters inside one of the
/// configured non-Latin ranges survive; everything else becomes a space.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    non_latin: Vec<RangeInclusive<char>>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            non_latin: vec![DEFAULT_NON_LATIN_RANGE],
        }
    }
}

impl TextNormalizer {
    /// Builds a normalizer that keeps the default CJK block plus `extra` ranges.
    pub fn with_ranges(extra: impl IntoIterator<Item = RangeInclusive<char>>) -> Self {
        let mut normalizer = Self::default();
        normalizer.non_latin.extend(extra);
        normalizer
    }

    fn keeps(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || c == ' ' || self.non_latin.iter().any(|r| r.contains(&c))
    }

    /// Strips `<script>`/`<style>` blocks, then every remaining tag, then noise characters.
    pub fn normalize_html(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }
        let without_blocks = script_style_re().replace_all(raw, " ");
        let without_tags = tag_re().replace_all(&without_blocks, " ");
        let without_entities = entity_re().replace_all(&without_tags, " ");
        self.finish(&without_entities)
    }

    /// Transcripts arrive as plain text: no markup pass, only case and whitespace folding.
    pub fn normalize_transcript(&self, raw: &str) -> String {
        raw.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    fn finish(&self, text: &str) -> String {
        let filtered: String = text
            .chars()
            .map(|c| if self.keeps(c) { c } else { ' ' })
            .collect();
        whitespace_re()
            .replace_all(&filtered, " ")
            .trim()
            .to_lowercase()
    }
}

/// Normalizes with the default character ranges.
pub fn normalize_html(raw: &str) -> String {
    TextNormalizer::default().normalize_html(raw)
}
