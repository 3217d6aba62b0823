use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::query::QueryContext;

/// Keyword → occurrence count. Keys are canonical (trimmed, lower-cased) keywords.
pub type KeywordCounts = BTreeMap<String, u32>;

/// Multiplicative decay applied to a page's raw score: `0.5^depth`.
pub fn depth_weight(depth: u32) -> f64 {
    0.5f64.powi(depth as i32)
}

// ---------------------------------------------------------------------------
// Pages & sites
// ---------------------------------------------------------------------------

/// One analyzed URL.
///
/// `raw_score`, `weight` and `weighted_score` only change together through
/// [`PageRecord::apply_depth`], which keeps `weighted_score == raw_score * weight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(skip)]
    pub raw_content: String,
    pub clean_text: String,
    pub keyword_counts: KeywordCounts,
    pub depth: u32,
    pub weight: f64,
    pub raw_score: i64,
    pub weighted_score: f64,
    /// `false` when the fetch degraded to empty content.
    pub fetch_ok: bool,
    pub is_transcript: bool,
}

impl PageRecord {
    /// A root-level record with scores not yet computed.
    pub fn new(
        url: impl Into<String>,
        raw_content: String,
        clean_text: String,
        keyword_counts: KeywordCounts,
        fetch_ok: bool,
        is_transcript: bool,
    ) -> Self {
        Self {
            url: url.into(),
            raw_content,
            clean_text,
            keyword_counts,
            depth: 0,
            weight: 1.0,
            raw_score: 0,
            weighted_score: 0.0,
            fetch_ok,
            is_transcript,
        }
    }

    /// Places the page at `depth` and scores its counts against the context's weights.
    pub fn apply_depth(&mut self, depth: u32, context: &QueryContext) {
        self.depth = depth;
        self.weight = depth_weight(depth);
        self.raw_score = self
            .keyword_counts
            .iter()
            .map(|(keyword, count)| i64::from(*count) * i64::from(context.weight_of(keyword)))
            .sum();
        self.weighted_score = self.raw_score as f64 * self.weight;
    }
}

/// A root page plus up to the crawl policy's cap of same-domain children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub root: PageRecord,
    pub children: Vec<PageRecord>,
}

impl SiteRecord {
    pub fn root_only(root: PageRecord) -> Self {
        Self {
            root,
            children: Vec::new(),
        }
    }

    /// Root's decayed score plus every child's decayed score.
    pub fn site_score(&self) -> f64 {
        self.root.weighted_score
            + self
                .children
                .iter()
                .map(|c| c.weighted_score)
                .sum::<f64>()
    }

    /// Undecayed sum of every page's raw score.
    pub fn raw_total(&self) -> i64 {
        self.root.raw_score + self.children.iter().map(|c| c.raw_score).sum::<i64>()
    }

    /// Integer keyword score: truncated site score, or the raw total when decay is disabled.
    pub fn keyword_score(&self, depth_weighting: bool) -> i64 {
        if depth_weighting {
            self.site_score().floor() as i64
        } else {
            self.raw_total()
        }
    }

    /// Root clean text followed by each child's, separated by a blank line.
    pub fn aggregated_content(&self) -> String {
        std::iter::once(self.root.clean_text.as_str())
            .chain(self.children.iter().map(|c| c.clean_text.as_str()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn child_urls(&self) -> Vec<String> {
        self.children.iter().map(|c| c.url.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// A candidate returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// A scored site as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub rank: usize,
    pub title: String,
    pub url: String,
    #[serde(skip)]
    pub aggregated_content: String,
    pub keyword_score: i64,
    pub similarity: f64,
    pub normalized_keyword: f64,
    pub normalized_similarity: f64,
    pub combined_score: f64,
    /// The score selected by the ranking mode.
    pub score: f64,
    /// Query round that first produced this result (1 or 2).
    pub round: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_urls: Vec<String>,
}

impl RankedResult {
    pub fn from_site(hit: &SearchHit, site: &SiteRecord, round: u8, depth_weighting: bool) -> Self {
        Self {
            rank: 0,
            title: hit.title.clone(),
            url: hit.url.clone(),
            aggregated_content: site.aggregated_content(),
            keyword_score: site.keyword_score(depth_weighting),
            similarity: 0.0,
            normalized_keyword: 0.0,
            normalized_similarity: 0.0,
            combined_score: 0.0,
            score: 0.0,
            round,
            child_urls: site.child_urls(),
        }
    }

    /// A provider hit listed without crawling or scoring.
    pub fn unscored(hit: SearchHit, rank: usize) -> Self {
        Self {
            rank,
            title: hit.title,
            url: hit.url,
            aggregated_content: String::new(),
            keyword_score: 0,
            similarity: 0.0,
            normalized_keyword: 0.0,
            normalized_similarity: 0.0,
            combined_score: 0.0,
            score: 0.0,
            round: 1,
            child_urls: Vec::new(),
        }
    }
}

/// Which normalized value drives the ordering and is exposed as `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    Keyword,
    Similarity,
    #[default]
    Hybrid,
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "similarity" | "semantic" => Ok(Self::Similarity),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown ranking mode: {}", other)),
        }
    }
}

/// Search path selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Keyword,
    Semantic,
    Iterative,
    Cse,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Iterative => "iterative",
            Self::Cse => "cse",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "keyword" => Ok(Self::Keyword),
            "semantic" => Ok(Self::Semantic),
            "iterative" => Ok(Self::Iterative),
            "cse" => Ok(Self::Cse),
            other => Err(format!(
                "unknown mode '{}' (expected keyword, semantic, iterative or cse)",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "query")]
    pub q: String,
    #[serde(default)]
    pub mode: Option<String>,
    /// Ordering override for iterative searches: `keyword`, `similarity` or `hybrid`.
    #[serde(default)]
    pub ranking: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_id: String,
    pub mode: SearchMode,
    pub query: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub derived_keywords: Vec<String>,
    pub count: usize,
    pub results: Vec<RankedResult>,
    #[serde(default)]
    pub logs: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CseResponse {
    pub query: String,
    pub count: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
