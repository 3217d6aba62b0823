//! Two-round iterative keyword search.
//!
//! Round 1 queries the provider with the user's keywords and crawls the top
//! results. Terms that co-occur with the query in those results are derived
//! and, when any exist, a second round runs with the expanded query. Both
//! rounds are merged by URL (round 1 wins) and ranked once.
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use super::pipeline::SearchPipeline;
use super::search::normalize_url_key;
use crate::core::error::SearchError;
use crate::core::query::QueryContext;
use crate::core::types::{RankedResult, RankingMode};

// ─────────────────────────────────────────────────────────────────────────────
// State machine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Round1Query,
    Round1Fetch,
    Derive,
    DeriveEmpty,
    Round2Query,
    Round2Fetch,
    Merge,
    Rank,
    Finalize,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchPhase::Round1Query => "round1-query",
            SearchPhase::Round1Fetch => "round1-fetch",
            SearchPhase::Derive => "derive",
            SearchPhase::DeriveEmpty => "derive-empty",
            SearchPhase::Round2Query => "round2-query",
            SearchPhase::Round2Fetch => "round2-fetch",
            SearchPhase::Merge => "merge",
            SearchPhase::Rank => "rank",
            SearchPhase::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

/// What an iterative search produced, including how it got there.
#[derive(Debug)]
pub struct IterativeOutcome {
    pub results: Vec<RankedResult>,
    pub derived_keywords: Vec<String>,
    /// Query text sent in round 2, if round 2 ran.
    pub round2_query: Option<String>,
    pub phases: Vec<SearchPhase>,
    pub logs: Vec<String>,
}

/// Drives one iterative search over a pipeline.
pub struct IterativeSearch<'a> {
    pipeline: &'a SearchPipeline,
    phases: Vec<SearchPhase>,
    logs: Vec<String>,
}

impl<'a> IterativeSearch<'a> {
    pub fn new(pipeline: &'a SearchPipeline) -> Self {
        Self {
            pipeline,
            phases: Vec::new(),
            logs: Vec::new(),
        }
    }

    fn enter(&mut self, phase: SearchPhase) {
        debug!("iterative search → {}", phase);
        self.phases.push(phase);
    }

    fn log(&mut self, line: String) {
        info!("{}", line);
        self.logs.push(line);
    }

    /// Runs both rounds for `ctx` (originals already weighted).
    ///
    /// Provider errors in either round abort the search.
    pub async fn run(mut self, ctx: QueryContext) -> Result<IterativeOutcome, SearchError> {
        let settings = self.pipeline.settings().clone();

        // ── Round 1 ──────────────────────────────────────────────────────────
        self.enter(SearchPhase::Round1Query);
        let query1 = ctx.query_text::<&str>(&[]);
        let hits1 = self
            .pipeline
            .query_provider(&query1, settings.initial_results)
            .await?;
        self.log(format!("round 1: {} candidates for \"{}\"", hits1.len(), query1));

        self.enter(SearchPhase::Round1Fetch);
        let round1 = self.pipeline.fetch_round(&hits1, &ctx, 1).await;
        // Derivation walks round 1 best-first, so its order decides which terms survive.
        let round1 = self.pipeline.scorer.with_mode(RankingMode::Keyword).rank(round1);

        // ── Derive ───────────────────────────────────────────────────────────
        self.enter(SearchPhase::Derive);
        let derived = self.derive_terms(&ctx, &round1, settings.terms_per_page);

        let (merged, round2_query, final_ctx) = if derived.is_empty() {
            self.enter(SearchPhase::DeriveEmpty);
            self.log("no derived keywords; ranking round 1 only".to_string());
            (round1, None, ctx)
        } else {
            self.log(format!("derived keywords: {}", derived.join(", ")));

            // ── Round 2 ──────────────────────────────────────────────────────
            self.enter(SearchPhase::Round2Query);
            let expanded = ctx.expanded(&derived, settings.derived_weight);
            let extra: Vec<&str> = derived
                .iter()
                .take(settings.expansion_terms)
                .map(String::as_str)
                .collect();
            let query2 = expanded.query_text(&extra);
            let hits2 = self
                .pipeline
                .query_provider(&query2, settings.final_results)
                .await?;
            self.log(format!("round 2: {} candidates for \"{}\"", hits2.len(), query2));

            self.enter(SearchPhase::Round2Fetch);
            let round2 = self.pipeline.fetch_round(&hits2, &expanded, 2).await;

            self.enter(SearchPhase::Merge);
            let merged = merge_by_url(round1, round2);
            self.log(format!("merged to {} unique results", merged.len()));
            (merged, Some(query2), expanded)
        };

        // ── Rank ─────────────────────────────────────────────────────────────
        self.enter(SearchPhase::Rank);
        let mut merged = merged;
        let similarity_query = final_ctx.query_text::<&str>(&[]);
        self.pipeline.attach_similarity(&similarity_query, &mut merged);
        let mut ranked = self.pipeline.scorer.rank(merged);
        ranked.truncate(settings.final_results);

        self.enter(SearchPhase::Finalize);
        self.log(format!(
            "ranked {} results ({:?} scoring)",
            ranked.len(),
            self.pipeline.scorer.mode()
        ));

        Ok(IterativeOutcome {
            results: ranked,
            derived_keywords: derived,
            round2_query,
            phases: self.phases,
            logs: self.logs,
        })
    }

    /// Union of the terms derived from each round-1 result, first-seen order,
    /// never repeating an original or an already derived term.
    fn derive_terms(&self, ctx: &QueryContext, round1: &[RankedResult], per_page: usize) -> Vec<String> {
        let mut known: HashSet<String> = ctx.known_terms();
        let mut derived = Vec::new();
        for result in round1 {
            let terms = self.pipeline.deriver.derive(
                &result.aggregated_content,
                per_page,
                ctx.original_keywords(),
                &known,
            );
            for term in terms {
                if known.insert(term.to_lowercase()) {
                    derived.push(term);
                }
            }
        }
        derived
    }
}

/// Round 1 followed by the round-2 results whose URL is new; the first occurrence wins.
pub fn merge_by_url(first: Vec<RankedResult>, second: Vec<RankedResult>) -> Vec<RankedResult> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|r| seen.insert(normalize_url_key(&r.url)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchHit;

    fn result(url: &str, round: u8) -> RankedResult {
        let mut r = RankedResult::unscored(
            SearchHit {
                title: url.to_string(),
                url: url.to_string(),
            },
            0,
        );
        r.round = round;
        r
    }

    #[test]
    fn merge_keeps_round_one_entries() {
        let merged = merge_by_url(
            vec![result("https://a.example/", 1), result("https://b.example/", 1)],
            vec![result("https://B.example", 2), result("https://c.example/", 2)],
        );
        let got: Vec<_> = merged.iter().map(|r| (r.url.as_str(), r.round)).collect();
        assert_eq!(
            got,
            [("https://a.example/", 1), ("https://b.example/", 1), ("https://c.example/", 2)]
        );
    }

    #[test]
    fn phases_render_kebab_case() {
        assert_eq!(SearchPhase::DeriveEmpty.to_string(), "derive-empty");
        assert_eq!(SearchPhase::Round2Fetch.to_string(), "round2-fetch");
    }
}
