//! One search call: provider query, budgeted crawl, scoring and mode dispatch.

use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::crawl::CrawlEngine;
use super::iterative::IterativeSearch;
use super::search::SearchProvider;
use crate::core::error::SearchError;
use crate::core::query::{parse_keywords, QueryContext};
use crate::core::types::{RankedResult, RankingMode, SearchHit, SearchMode, SearchResponse};
use crate::nlp::derive::KeywordDeriver;
use crate::nlp::hybrid::HybridScorer;
use crate::nlp::similarity::SimilarityRanker;

/// Result counts and weights for every search mode.
#[derive(Debug, Clone)]
pub struct IterativeSettings {
    /// Weight of user keywords in every round.
    pub original_weight: u32,
    /// Weight of derived keywords in round 2.
    pub derived_weight: u32,
    /// Results crawled in round 1 (K).
    pub initial_results: usize,
    /// Results crawled in round 2 and kept after the final rank (FinalK).
    pub final_results: usize,
    /// Terms derived from each round-1 result.
    pub terms_per_page: usize,
    /// Derived terms appended to the round-2 query text.
    pub expansion_terms: usize,
    /// Keyword-ranked results re-scored with similarity in semantic mode.
    pub semantic_candidates: usize,
}

impl Default for IterativeSettings {
    fn default() -> Self {
        Self {
            original_weight: 10,
            derived_weight: 5,
            initial_results: 5,
            final_results: 10,
            terms_per_page: 3,
            expansion_terms: 3,
            semantic_candidates: 5,
        }
    }
}

/// Everything one search call needs. Built fresh per call by `AppState::pipeline`.
pub struct SearchPipeline {
    pub(crate) provider: Arc<dyn SearchProvider>,
    pub(crate) crawler: CrawlEngine,
    pub(crate) similarity: SimilarityRanker,
    pub(crate) scorer: HybridScorer,
    pub(crate) deriver: KeywordDeriver,
    pub(crate) settings: IterativeSettings,
    pub(crate) bias_terms: Vec<String>,
    pub(crate) depth_weighting: bool,
}

impl SearchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        crawler: CrawlEngine,
        similarity: SimilarityRanker,
        scorer: HybridScorer,
        deriver: KeywordDeriver,
        settings: IterativeSettings,
        bias_terms: Vec<String>,
        depth_weighting: bool,
    ) -> Self {
        Self {
            provider,
            crawler,
            similarity,
            scorer,
            deriver,
            settings,
            bias_terms,
            depth_weighting,
        }
    }

    /// Overrides the configured ordering for this call.
    pub fn with_ranking_mode(mut self, mode: RankingMode) -> Self {
        self.scorer = self.scorer.with_mode(mode);
        self
    }

    pub fn settings(&self) -> &IterativeSettings {
        &self.settings
    }

    /// Round context: originals at the configured weight plus bias terms at weight 1.
    pub fn context_for(&self, keywords: &[String]) -> QueryContext {
        QueryContext::new(keywords, self.settings.original_weight).with_bias_terms(&self.bias_terms)
    }

    /// Provider candidates for `text`, at most `k`.
    pub async fn query_provider(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        let mut hits = self.provider.query(text, k).await?;
        hits.truncate(k);
        info!("{} returned {} candidates for {:?}", self.provider.name(), hits.len(), text);
        Ok(hits)
    }

    /// Crawls every hit and turns each site into an unranked result, in hit order.
    pub async fn fetch_round(&self, hits: &[SearchHit], context: &QueryContext, round: u8) -> Vec<RankedResult> {
        let urls: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
        let sites = self.crawler.crawl_sites(&urls, context).await;
        hits.iter()
            .zip(sites.iter())
            .map(|(hit, site)| {
                let result = RankedResult::from_site(hit, site, round, self.depth_weighting);
                if result.aggregated_content.is_empty() {
                    warn!("no content for {} (round {})", hit.url, round);
                }
                result
            })
            .collect()
    }

    /// Fills `similarity` for every result against `query`.
    pub fn attach_similarity(&self, query: &str, results: &mut [RankedResult]) {
        for r in results.iter_mut() {
            r.similarity = self.similarity.similarity(query, &r.aggregated_content);
        }
    }

    /// Single round ranked by keyword score.
    async fn keyword_search(&self, ctx: &QueryContext, logs: &mut Vec<String>) -> Result<Vec<RankedResult>, SearchError> {
        let query = ctx.query_text::<&str>(&[]);
        let hits = self.query_provider(&query, self.settings.final_results).await?;
        logs.push(format!("keyword: {} candidates for \"{}\"", hits.len(), query));
        let mut results = self.fetch_round(&hits, ctx, 1).await;
        self.attach_similarity(&query, &mut results);
        Ok(self.scorer.with_mode(RankingMode::Keyword).rank(results))
    }

    /// Single round; the top keyword-ranked candidates are re-ranked with the hybrid score.
    async fn semantic_search(&self, ctx: &QueryContext, logs: &mut Vec<String>) -> Result<Vec<RankedResult>, SearchError> {
        let query = ctx.query_text::<&str>(&[]);
        let hits = self.query_provider(&query, self.settings.final_results).await?;
        logs.push(format!("semantic: {} candidates for \"{}\"", hits.len(), query));
        let results = self.fetch_round(&hits, ctx, 1).await;

        let mut top = self.scorer.with_mode(RankingMode::Keyword).rank(results);
        top.truncate(self.settings.semantic_candidates);
        self.attach_similarity(&query, &mut top);
        logs.push(format!("semantic: re-ranked top {} by hybrid score", top.len()));
        Ok(self.scorer.with_mode(RankingMode::Hybrid).rank(top))
    }

    /// Provider hits only: no crawl, no scores.
    async fn cse_search(&self, ctx: &QueryContext, logs: &mut Vec<String>) -> Result<Vec<RankedResult>, SearchError> {
        let query = ctx.query_text::<&str>(&[]);
        let hits = self.query_provider(&query, self.settings.final_results).await?;
        logs.push(format!("cse: {} hits for \"{}\"", hits.len(), query));
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| RankedResult::unscored(hit, i + 1))
            .collect())
    }

    /// Parses `raw_query`, runs the selected mode and assembles the response.
    ///
    /// Provider failures abort the call; page failures only lower that page's score.
    pub async fn execute(&self, raw_query: &str, mode: SearchMode) -> Result<SearchResponse, SearchError> {
        let keywords = parse_keywords(raw_query);
        if keywords.is_empty() {
            return Err(SearchError::InvalidQuery("query has no keywords".to_string()));
        }

        let search_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("search", id = %search_id, mode = %mode);

        async move {
            info!("search started: {:?}", keywords);
            let ctx = self.context_for(&keywords);
            let mut logs = Vec::new();
            let mut derived = Vec::new();

            let results = match mode {
                SearchMode::Keyword => self.keyword_search(&ctx, &mut logs).await?,
                SearchMode::Semantic => self.semantic_search(&ctx, &mut logs).await?,
                SearchMode::Cse => self.cse_search(&ctx, &mut logs).await?,
                SearchMode::Iterative => {
                    let outcome = IterativeSearch::new(self).run(ctx.clone()).await?;
                    logs.extend(outcome.logs);
                    derived = outcome.derived_keywords;
                    outcome.results
                }
            };

            info!("search finished with {} results", results.len());
            Ok(SearchResponse {
                search_id: search_id.clone(),
                mode,
                query: raw_query.trim().to_string(),
                keywords: ctx.original_keywords().to_vec(),
                derived_keywords: derived,
                count: results.len(),
                results,
                logs,
                generated_at: chrono::Utc::now(),
            })
        }
        .instrument(span)
        .await
    }
}
