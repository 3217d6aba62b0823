use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::core::types::RankingMode;
use crate::nlp::hybrid::{HybridWeights, DEFAULT_DEGENERATE_VALUE};
use crate::nlp::stopwords::{TermSet, DEFAULT_BIAS_TERMS, DEFAULT_FILLER_TERMS};
use crate::scraping::{DomainMatch, FetchSettings};
use crate::tools::crawl::{CrawlPolicy, MAX_CHILDREN_LIMIT};
use crate::tools::pipeline::IterativeSettings;
use crate::tools::search::google_cse::{QueryBias, DEFAULT_CSE_ENDPOINT};

// ---------------------------------------------------------------------------
// SiteRankConfig: file-based config loader (siterank.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "SITERANK_CONFIG";
pub const ENV_CSE_API_KEY: &str = "GOOGLE_CSE_APIKEY";
pub const ENV_CSE_CX: &str = "GOOGLE_CSE_CX";

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Search provider credentials (mirrors the `provider` key in siterank.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct ProviderSection {
    /// Google CSE API key. Never logged.
    pub api_key: Option<String>,
    /// Google CSE engine id.
    pub cx: Option<String>,
    /// Override for the CSE endpoint (useful against a local mock).
    pub endpoint: Option<String>,
    /// `auto` (default), `always` or `never`.
    pub query_bias: Option<QueryBias>,
}

impl ProviderSection {
    /// API key: JSON field → `GOOGLE_CSE_APIKEY` env var → `None`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| env_non_empty(ENV_CSE_API_KEY))
    }

    /// Engine id: JSON field → `GOOGLE_CSE_CX` env var → `None`.
    pub fn resolve_cx(&self) -> Option<String> {
        self.cx
            .as_ref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| env_non_empty(ENV_CSE_CX))
    }

    /// Endpoint: JSON field → `GOOGLE_CSE_ENDPOINT` env var → Google's public endpoint.
    pub fn resolve_endpoint(&self) -> String {
        self.endpoint
            .as_ref()
            .filter(|e| !e.trim().is_empty())
            .cloned()
            .or_else(|| env_non_empty("GOOGLE_CSE_ENDPOINT"))
            .unwrap_or_else(|| DEFAULT_CSE_ENDPOINT.to_string())
    }

    /// Bias: JSON field → `GOOGLE_CSE_APPEND_ISO` / `SEARCH_BIAS_ISO` (true forces it) → `auto`.
    pub fn resolve_query_bias(&self) -> QueryBias {
        if let Some(b) = self.query_bias {
            return b;
        }
        let forced = ["GOOGLE_CSE_APPEND_ISO", "SEARCH_BIAS_ISO"]
            .iter()
            .any(|k| env_flag(k) == Some(true));
        if forced {
            QueryBias::Always
        } else {
            QueryBias::Auto
        }
    }
}

/// Page fetch transport (mirrors the `fetch` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct FetchSection {
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub rotate_user_agent: Option<bool>,
}

impl FetchSection {
    /// Timeouts: JSON → `FETCH_CONNECT_TIMEOUT_MS` / `FETCH_READ_TIMEOUT_MS` → 1500 / 2500.
    pub fn resolve(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            connect_timeout: self
                .connect_timeout_ms
                .or_else(|| env_parse("FETCH_CONNECT_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            read_timeout: self
                .read_timeout_ms
                .or_else(|| env_parse("FETCH_READ_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_timeout),
            rotate_user_agent: self
                .rotate_user_agent
                .unwrap_or(defaults.rotate_user_agent),
        }
    }
}

/// Crawl limits (mirrors the `crawl` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct CrawlSection {
    pub max_children: Option<usize>,
    pub site_budget_ms: Option<u64>,
    pub sublink_budget_ms: Option<u64>,
    pub max_concurrent_sites: Option<usize>,
    /// When `false`, a site's keyword score is the plain sum of page scores.
    pub depth_weighting: Option<bool>,
    /// `exact` (default) or `ignore_www`.
    pub domain_match: Option<DomainMatch>,
}

impl CrawlSection {
    /// Limits: JSON → `CRAWL_MAX_CHILDREN` / `CRAWL_SITE_BUDGET_MS` / `CRAWL_SUBLINK_BUDGET_MS` → defaults.
    pub fn resolve(&self) -> CrawlPolicy {
        let defaults = CrawlPolicy::default();
        CrawlPolicy {
            max_children: clamp_children(
                self.max_children
                    .or_else(|| env_parse("CRAWL_MAX_CHILDREN"))
                    .unwrap_or(defaults.max_children),
            ),
            site_budget: self
                .site_budget_ms
                .or_else(|| env_parse("CRAWL_SITE_BUDGET_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.site_budget),
            sublink_budget: self
                .sublink_budget_ms
                .or_else(|| env_parse("CRAWL_SUBLINK_BUDGET_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.sublink_budget),
            max_concurrent_sites: self
                .max_concurrent_sites
                .unwrap_or(defaults.max_concurrent_sites)
                .max(1),
            domain_match: self.domain_match.unwrap_or(defaults.domain_match),
        }
    }

    pub fn resolve_depth_weighting(&self) -> bool {
        self.depth_weighting.unwrap_or(true)
    }
}

fn clamp_children(requested: usize) -> usize {
    if requested > MAX_CHILDREN_LIMIT {
        tracing::warn!(
            "crawl.max_children {} exceeds limit; using {}",
            requested, MAX_CHILDREN_LIMIT
        );
        MAX_CHILDREN_LIMIT
    } else {
        requested
    }
}

/// Hybrid scoring knobs (mirrors the `scoring` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct ScoringSection {
    pub keyword_weight: Option<f64>,
    pub similarity_weight: Option<f64>,
    /// Normalized value for a flat batch. Default: 0.5.
    pub degenerate_value: Option<f64>,
    /// Ordering for iterative searches: `keyword`, `similarity` or `hybrid` (default).
    pub ranking_mode: Option<RankingMode>,
}

impl ScoringSection {
    pub fn resolve_weights(&self) -> HybridWeights {
        match (self.keyword_weight, self.similarity_weight) {
            (None, None) => HybridWeights::default(),
            (k, s) => {
                let d = HybridWeights::default();
                HybridWeights::new(k.unwrap_or(d.keyword()), s.unwrap_or(d.similarity()))
            }
        }
    }

    pub fn resolve_degenerate_value(&self) -> f64 {
        self.degenerate_value.unwrap_or(DEFAULT_DEGENERATE_VALUE)
    }

    pub fn resolve_ranking_mode(&self) -> RankingMode {
        self.ranking_mode.unwrap_or_default()
    }
}

/// Iterative search sizing (mirrors the `iterative` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct IterativeSection {
    pub original_weight: Option<u32>,
    pub derived_weight: Option<u32>,
    pub initial_results: Option<usize>,
    pub final_results: Option<usize>,
    pub terms_per_page: Option<usize>,
    pub expansion_terms: Option<usize>,
    pub semantic_candidates: Option<usize>,
}

impl IterativeSection {
    pub fn resolve(&self) -> IterativeSettings {
        let d = IterativeSettings::default();
        IterativeSettings {
            original_weight: self.original_weight.unwrap_or(d.original_weight).max(1),
            derived_weight: self.derived_weight.unwrap_or(d.derived_weight).max(1),
            initial_results: self.initial_results.unwrap_or(d.initial_results).max(1),
            final_results: self.final_results.unwrap_or(d.final_results).max(1),
            terms_per_page: self.terms_per_page.unwrap_or(d.terms_per_page),
            expansion_terms: self.expansion_terms.unwrap_or(d.expansion_terms),
            semantic_candidates: self.semantic_candidates.unwrap_or(d.semantic_candidates).max(1),
        }
    }
}

/// Vocabulary lists (mirrors the `text` key). Extra entries extend the built-in lists.
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct TextSection {
    /// Replaces the default bias terms when present.
    pub bias_terms: Option<Vec<String>>,
    pub extra_filler_terms: Vec<String>,
    pub extra_stopwords: Vec<String>,
    /// Additional preserved code point ranges, e.g. `[[12352, 12543]]` for kana.
    pub extra_non_latin_ranges: Vec<[u32; 2]>,
}

impl TextSection {
    pub fn resolve_bias_terms(&self) -> Vec<String> {
        self.bias_terms.clone().unwrap_or_else(|| {
            DEFAULT_BIAS_TERMS.iter().map(|t| t.to_string()).collect()
        })
    }

    pub fn resolve_stopwords(&self) -> TermSet {
        let mut set = TermSet::english_stopwords();
        set.extend(&self.extra_stopwords);
        set
    }

    pub fn resolve_filler_terms(&self) -> TermSet {
        let mut set = TermSet::new(DEFAULT_FILLER_TERMS);
        set.extend(&self.extra_filler_terms);
        set
    }

    /// Ranges with invalid code points or reversed bounds are skipped.
    pub fn resolve_non_latin_ranges(&self) -> Vec<RangeInclusive<char>> {
        self.extra_non_latin_ranges
            .iter()
            .filter_map(|[lo, hi]| {
                let lo = char::from_u32(*lo)?;
                let hi = char::from_u32(*hi)?;
                (lo <= hi).then_some(lo..=hi)
            })
            .collect()
    }
}

/// Top-level config loaded from `siterank.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct SiteRankConfig {
    pub provider: ProviderSection,
    pub fetch: FetchSection,
    pub crawl: CrawlSection,
    pub scoring: ScoringSection,
    pub iterative: IterativeSection,
    pub text: TextSection,
}

/// Load `siterank.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `SITERANK_CONFIG` env var path
/// 2. `./siterank.json`
/// 3. `../siterank.json`
///
/// Missing file → `SiteRankConfig::default()` (all env-var fallbacks apply).
/// Parse error → log a warning, return `SiteRankConfig::default()`.
pub fn load_config() -> SiteRankConfig {
    let mut candidates = vec![
        std::path::PathBuf::from("siterank.json"),
        std::path::PathBuf::from("../siterank.json"),
    ];
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        candidates.insert(0, std::path::PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match parse_config(&contents) {
            Ok(cfg) => {
                tracing::info!("siterank.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    "siterank.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                SiteRankConfig::default()
            }
        };
    }

    SiteRankConfig::default()
}

pub fn parse_config(contents: &str) -> anyhow::Result<SiteRankConfig> {
    Ok(serde_json::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_reference_defaults() {
        let cfg = parse_config("{}").unwrap();
        let crawl = cfg.crawl.resolve();
        assert_eq!(crawl.max_children, 2);
        assert_eq!(crawl.domain_match, DomainMatch::Exact);
        assert!(cfg.crawl.resolve_depth_weighting());
        assert_eq!(cfg.scoring.resolve_weights(), HybridWeights::default());
        assert_eq!(cfg.scoring.resolve_ranking_mode(), RankingMode::Hybrid);
        let it = cfg.iterative.resolve();
        assert_eq!(it.original_weight, 10);
        assert_eq!(it.derived_weight, 5);
        assert_eq!(it.initial_results, 5);
        assert_eq!(it.final_results, 10);
        assert_eq!(it.terms_per_page, 3);
        assert_eq!(it.expansion_terms, 3);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = parse_config(
            r#"{
                "provider": { "api_key": "k", "cx": "c", "query_bias": "never" },
                "crawl": { "max_children": 3, "site_budget_ms": 8000, "domain_match": "ignore_www", "depth_weighting": false },
                "scoring": { "keyword_weight": 1.0, "similarity_weight": 1.0, "ranking_mode": "keyword" },
                "text": { "extra_stopwords": ["iso"], "extra_non_latin_ranges": [[12352, 12543], [10, 5]] }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.provider.resolve_api_key().as_deref(), Some("k"));
        assert_eq!(cfg.provider.resolve_query_bias(), QueryBias::Never);
        let crawl = cfg.crawl.resolve();
        assert_eq!(crawl.max_children, 3);
        assert_eq!(crawl.site_budget, Duration::from_secs(8));
        assert_eq!(crawl.domain_match, DomainMatch::IgnoreWww);
        assert!(!cfg.crawl.resolve_depth_weighting());
        assert_eq!(cfg.scoring.resolve_weights().keyword(), 0.5);
        assert_eq!(cfg.scoring.resolve_ranking_mode(), RankingMode::Keyword);
        assert!(cfg.text.resolve_stopwords().contains("iso"));
        assert_eq!(cfg.text.resolve_non_latin_ranges(), vec!['\u{3040}'..='\u{30ff}']);
    }

    #[test]
    fn oversized_child_cap_is_clamped() {
        let cfg = parse_config(r#"{ "crawl": { "max_children": 50 } }"#).unwrap();
        assert_eq!(cfg.crawl.resolve().max_children, MAX_CHILDREN_LIMIT);

        let cfg = parse_config(r#"{ "crawl": { "max_children": 0 } }"#).unwrap();
        assert_eq!(cfg.crawl.resolve().max_children, 0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_config("{ not json").is_err());
    }
}
