use std::collections::HashSet;

/// Classic English stopword set used by most Lucene-style analyzers.
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Terms appended to every round's weight map at weight 1 unless the user already asked for them.
pub const DEFAULT_BIAS_TERMS: &[&str] = &["international", "organization", "standardization"];

/// Organization-domain filler never worth deriving as a new keyword.
pub const DEFAULT_FILLER_TERMS: &[&str] = &[
    "international",
    "organization",
    "standardization",
    "standards",
];

/// Case-insensitive term set. Entries are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    terms: HashSet<String>,
}

impl TermSet {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(terms);
        set
    }

    pub fn english_stopwords() -> Self {
        Self::new(ENGLISH_STOPWORDS)
    }

    pub fn filler_terms() -> Self {
        Self::new(DEFAULT_FILLER_TERMS)
    }

    pub fn extend<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.terms.extend(
            terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(&term.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
