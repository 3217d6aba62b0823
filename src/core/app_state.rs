use std::env;
use std::sync::Arc;

use crate::core::config::SiteRankConfig;
use crate::nlp::derive::KeywordDeriver;
use crate::nlp::hybrid::HybridScorer;
use crate::nlp::normalize::TextNormalizer;
use crate::nlp::similarity::SimilarityRanker;
use crate::scraping::{ContentFetcher, HttpFetcher, TranscriptFetcher, YoutubeTranscriptFetcher};
use crate::tools::analyze::PageAnalyzer;
use crate::tools::crawl::CrawlEngine;
use crate::tools::pipeline::SearchPipeline;
use crate::tools::search::{GoogleCseProvider, SearchProvider};

/// Long-lived collaborators shared by every request.
///
/// Nothing here holds per-search data: each call gets its own pipeline
/// (and with it a fresh page cache) from [`AppState::pipeline`].
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub provider: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub transcripts: Arc<dyn TranscriptFetcher>,
    // Concurrency control for outbound page fetches
    pub outbound_limit: Arc<tokio::sync::Semaphore>,
    /// File-based config loaded from `siterank.json` (env-var fallback for most fields).
    pub config: Arc<SiteRankConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("provider", &self.provider.name())
            .field("outbound_permits", &self.outbound_limit.available_permits())
            .finish()
    }
}

impl AppState {
    /// Wires the HTTP fetcher, YouTube transcript fetcher and Google CSE provider.
    ///
    /// `http_client` is used for provider calls; page fetches get their own
    /// client with the tighter fetch timeouts from `config`.
    pub fn new(http_client: reqwest::Client, config: SiteRankConfig) -> anyhow::Result<Self> {
        let outbound_limit = env::var("OUTBOUND_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(32);
        let outbound_limit = Arc::new(tokio::sync::Semaphore::new(outbound_limit.max(1)));

        let fetcher: Arc<dyn ContentFetcher> = Arc::new(HttpFetcher::from_settings(
            &config.fetch.resolve(),
            outbound_limit.clone(),
        )?);
        let transcripts: Arc<dyn TranscriptFetcher> =
            Arc::new(YoutubeTranscriptFetcher::new(fetcher.clone()));
        let provider: Arc<dyn SearchProvider> = Arc::new(GoogleCseProvider::from_config(
            http_client.clone(),
            &config.provider,
        ));

        Ok(Self {
            http_client,
            provider,
            fetcher,
            transcripts,
            outbound_limit,
            config: Arc::new(config),
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_transcripts(mut self, transcripts: Arc<dyn TranscriptFetcher>) -> Self {
        self.transcripts = transcripts;
        self
    }

    /// A pipeline for exactly one search call.
    pub fn pipeline(&self) -> SearchPipeline {
        let cfg = &self.config;
        let normalizer = TextNormalizer::with_ranges(cfg.text.resolve_non_latin_ranges());
        let analyzer = Arc::new(PageAnalyzer::new(
            self.fetcher.clone(),
            self.transcripts.clone(),
            normalizer,
        ));
        let crawler = CrawlEngine::new(analyzer, cfg.crawl.resolve());
        let scorer = HybridScorer::new(
            cfg.scoring.resolve_weights(),
            cfg.scoring.resolve_degenerate_value(),
            cfg.scoring.resolve_ranking_mode(),
        );

        SearchPipeline::new(
            self.provider.clone(),
            crawler,
            SimilarityRanker::new(cfg.text.resolve_stopwords()),
            scorer,
            KeywordDeriver::new(cfg.text.resolve_stopwords(), cfg.text.resolve_filler_terms()),
            cfg.iterative.resolve(),
            cfg.text.resolve_bias_terms(),
            cfg.crawl.resolve_depth_weighting(),
        )
    }
}
