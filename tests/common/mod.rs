#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use siterank::core::config::SiteRankConfig;
use siterank::scraping::{ContentFetcher, FetchOutcome, TranscriptFetcher};
use siterank::search::SearchProvider;
use siterank::{AppState, ProviderError, SearchHit};

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn hit(title: &str, url: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
    }
}

/// Provider answering from a fixed table keyed by the exact query text.
/// Unknown queries return `fallback`. Every query is recorded.
#[derive(Default)]
pub struct TableProvider {
    answers: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    pub queries: Mutex<Vec<String>>,
}

impl TableProvider {
    pub fn new(fallback: Vec<SearchHit>) -> Self {
        Self {
            fallback,
            ..Default::default()
        }
    }

    pub fn answer(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.answers.insert(query.to_string(), hits);
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    async fn query(&self, text: &str, num_results: usize) -> Result<Vec<SearchHit>, ProviderError> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(text.to_string());
        }
        let mut hits = self
            .answers
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        hits.truncate(num_results);
        Ok(hits)
    }
}

/// Provider that always fails the request.
pub struct BrokenProvider;

#[async_trait]
impl SearchProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    async fn query(&self, _text: &str, _num_results: usize) -> Result<Vec<SearchHit>, ProviderError> {
        Err(ProviderError::Response("HTTP 500: backend error".to_string()))
    }
}

/// In-memory site: URL → (latency, body). Unknown URLs degrade.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, (Duration, String)>,
    pub fetched: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.slow_page(url, Duration::ZERO, body)
    }

    pub fn slow_page(mut self, url: &str, latency: Duration, body: &str) -> Self {
        self.pages.insert(url.to_string(), (latency, body.to_string()));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().map(|f| f.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        if let Ok(mut f) = self.fetched.lock() {
            f.push(url.to_string());
        }
        match self.pages.get(url) {
            Some((latency, body)) => {
                if !latency.is_zero() {
                    tokio::time::sleep(*latency).await;
                }
                FetchOutcome::from_body(body.clone())
            }
            None => FetchOutcome::Degraded("http 404".to_string()),
        }
    }
}

/// Transcript source returning the same text for every video.
pub struct StaticTranscripts(pub &'static str);

#[async_trait]
impl TranscriptFetcher for StaticTranscripts {
    async fn fetch_transcript(&self, _url: &str) -> String {
        self.0.to_string()
    }
}

/// App state over in-memory collaborators; no network is touched.
pub fn state_with(
    config: SiteRankConfig,
    provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn ContentFetcher>,
) -> AppState {
    AppState::new(reqwest::Client::new(), config)
        .expect("app state")
        .with_provider(provider)
        .with_fetcher(fetcher)
        .with_transcripts(Arc::new(StaticTranscripts("")))
}
