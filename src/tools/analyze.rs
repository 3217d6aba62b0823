use std::sync::Arc;
use tracing::debug;

use crate::core::types::PageRecord;
use crate::nlp::keywords::KeywordCounter;
use crate::nlp::normalize::TextNormalizer;
use crate::scraping::{is_transcript_url, ContentFetcher, TranscriptFetcher};

/// Content of one URL, fetched once per search call.
#[derive(Debug)]
struct FetchedPage {
    raw: String,
    clean: String,
    ok: bool,
    transcript: bool,
}

/// Fetch → normalize → count for a single URL.
///
/// Each analyzer owns a private cache, so a URL that shows up in both rounds
/// (or as a child of two roots) is downloaded once while its keyword counts
/// are recomputed for every request. Build one analyzer per search call.
pub struct PageAnalyzer {
    fetcher: Arc<dyn ContentFetcher>,
    transcripts: Arc<dyn TranscriptFetcher>,
    normalizer: TextNormalizer,
    cache: moka::future::Cache<String, Arc<FetchedPage>>,
}

impl PageAnalyzer {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        transcripts: Arc<dyn TranscriptFetcher>,
        normalizer: TextNormalizer,
    ) -> Self {
        Self {
            fetcher,
            transcripts,
            normalizer,
            cache: moka::future::Cache::builder().max_capacity(1_000).build(),
        }
    }

    async fn load(&self, url: &str) -> Arc<FetchedPage> {
        self.cache
            .get_with(url.to_string(), async {
                if is_transcript_url(url) {
                    let raw = self.transcripts.fetch_transcript(url).await;
                    let clean = self.normalizer.normalize_transcript(&raw);
                    Arc::new(FetchedPage {
                        ok: !clean.is_empty(),
                        raw,
                        clean,
                        transcript: true,
                    })
                } else {
                    let outcome = self.fetcher.fetch(url).await;
                    let ok = outcome.ok();
                    if !ok {
                        debug!("degraded fetch for {}: {:?}", url, outcome);
                    }
                    let raw = outcome.into_content();
                    let clean = self.normalizer.normalize_html(&raw);
                    Arc::new(FetchedPage {
                        raw,
                        clean,
                        ok,
                        transcript: false,
                    })
                }
            })
            .await
    }

    /// Depth-0 record with counts for `keywords`; the caller sets depth and scores.
    ///
    /// A failed fetch yields empty content and all-zero counts, never an error.
    pub async fn analyze<S: AsRef<str>>(&self, url: &str, keywords: &[S]) -> PageRecord {
        self.analyze_with(url, &KeywordCounter::new(keywords)).await
    }

    /// Same as [`analyze`](Self::analyze) with matchers compiled by the caller.
    pub async fn analyze_with(&self, url: &str, counter: &KeywordCounter) -> PageRecord {
        let page = self.load(url).await;
        let counts = counter.count(&page.clean);
        PageRecord::new(
            url,
            page.raw.clone(),
            page.clean.clone(),
            counts,
            page.ok,
            page.transcript,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::FetchOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        body: Option<&'static str>,
    }

    #[async_trait]
    impl ContentFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(b) => FetchOutcome::Fetched(b.to_string()),
                None => FetchOutcome::Degraded("connect timeout".to_string()),
            }
        }
    }

    struct FixedTranscript(&'static str);

    #[async_trait]
    impl TranscriptFetcher for FixedTranscript {
        async fn fetch_transcript(&self, _url: &str) -> String {
            self.0.to_string()
        }
    }

    fn analyzer(body: Option<&'static str>, transcript: &'static str) -> (PageAnalyzer, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            body,
        });
        let a = PageAnalyzer::new(
            fetcher.clone(),
            Arc::new(FixedTranscript(transcript)),
            TextNormalizer::default(),
        );
        (a, fetcher)
    }

    #[tokio::test]
    async fn html_pages_are_normalized_and_counted() {
        let (a, _) = analyzer(Some("<html><body><h1>ISO</h1> standard ISO</body></html>"), "");
        let page = a.analyze("https://www.iso.org/", &["iso", "standard"]).await;
        assert!(page.fetch_ok);
        assert!(!page.is_transcript);
        assert_eq!(page.clean_text, "iso standard iso");
        assert_eq!(page.keyword_counts["iso"], 2);
        assert_eq!(page.keyword_counts["standard"], 1);
        assert_eq!(page.depth, 0);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_zero_counts() {
        let (a, _) = analyzer(None, "");
        let page = a.analyze("https://down.example/", &["iso"]).await;
        assert!(!page.fetch_ok);
        assert_eq!(page.raw_content, "");
        assert_eq!(page.keyword_counts["iso"], 0);
    }

    #[tokio::test]
    async fn transcript_urls_skip_html_normalization() {
        let (a, fetcher) = analyzer(Some("<p>unused</p>"), "ISO <b> standard talk");
        let page = a
            .analyze("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &["iso", "b"])
            .await;
        assert!(page.is_transcript);
        assert_eq!(page.clean_text, "iso <b> standard talk");
        assert_eq!(page.keyword_counts["b"], 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn content_is_fetched_once_but_recounted() {
        let (a, fetcher) = analyzer(Some("iso sensor sensor"), "");
        let first = tokio_test::block_on(a.analyze("https://a.example/", &["iso"]));
        let second = tokio_test::block_on(a.analyze("https://a.example/", &["sensor"]));
        assert_eq!(first.keyword_counts["iso"], 1);
        assert_eq!(second.keyword_counts["sensor"], 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
