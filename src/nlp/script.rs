//! Script detection helpers shared by the keyword counter and the deriver.

use std::ops::RangeInclusive;
use whatlang::Script;

/// Default non-Latin range preserved by the normalizer (CJK Unified Ideographs, common block).
pub const DEFAULT_NON_LATIN_RANGE: RangeInclusive<char> = '\u{4e00}'..='\u{9fa5}';

/// `true` when the character belongs to a Han, Hiragana or Katakana script.
pub fn is_cjk_char(c: char) -> bool {
    if c.is_ascii() {
        return false;
    }
    let mut buf = [0u8; 4];
    matches!(
        whatlang::detect_script(c.encode_utf8(&mut buf)),
        Some(Script::Mandarin | Script::Hiragana | Script::Katakana)
    )
}

/// `true` when at least one character of `text` is CJK.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

/// `true` for characters `\b` treats as word characters.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_han_and_kana() {
        assert!(is_cjk_char('标'));
        assert!(is_cjk_char('ひ'));
        assert!(is_cjk_char('カ'));
        assert!(!is_cjk_char('a'));
        assert!(!is_cjk_char('é'));
    }

    #[test]
    fn mixed_text_contains_cjk() {
        assert!(contains_cjk("iso标准"));
        assert!(!contains_cjk("isolate"));
    }
}
