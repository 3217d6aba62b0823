use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::analyze::PageAnalyzer;
use crate::core::query::QueryContext;
use crate::core::types::SiteRecord;
use crate::nlp::keywords::KeywordCounter;
use crate::scraping::{extract_links, is_transcript_url, DomainMatch};

/// Children are one hop from the root; nothing deeper is ever fetched.
pub const MAX_CRAWL_DEPTH: u32 = 1;

/// Upper bound accepted from configuration for children per site.
pub const MAX_CHILDREN_LIMIT: usize = 3;

/// Limits for expanding one root URL into a site.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    /// Children kept per site.
    pub max_children: usize,
    /// Wall-clock budget for a whole site, measured from before the root fetch.
    pub site_budget: Duration,
    /// Budget for the child phase, measured from when link iteration starts.
    pub sublink_budget: Duration,
    /// Root sites crawled at the same time.
    pub max_concurrent_sites: usize,
    pub domain_match: DomainMatch,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            max_children: 2,
            site_budget: Duration::from_millis(5_000),
            sublink_budget: Duration::from_millis(3_000),
            max_concurrent_sites: 5,
            domain_match: DomainMatch::Exact,
        }
    }
}

/// Budgeted root + children crawler.
///
/// Budgets are cooperative: once spent no new child fetch starts, but an
/// in-flight fetch runs until its own HTTP timeout.
pub struct CrawlEngine {
    analyzer: Arc<PageAnalyzer>,
    policy: CrawlPolicy,
}

impl CrawlEngine {
    pub fn new(analyzer: Arc<PageAnalyzer>, policy: CrawlPolicy) -> Self {
        Self { analyzer, policy }
    }

    pub fn policy(&self) -> &CrawlPolicy {
        &self.policy
    }

    /// Expands `url` into a root page plus same-domain children.
    ///
    /// Children keep link discovery order. Iteration stops at the first link
    /// found after the cap is reached or either budget is spent; whatever was
    /// collected so far is kept.
    pub async fn crawl_site(&self, url: &str, context: &QueryContext) -> SiteRecord {
        let counter = KeywordCounter::new(&context.counting_keywords());
        self.crawl_site_with(url, context, &counter).await
    }

    async fn crawl_site_with(
        &self,
        url: &str,
        context: &QueryContext,
        counter: &KeywordCounter,
    ) -> SiteRecord {
        let site_start = Instant::now();

        let mut root = self.analyzer.analyze_with(url, counter).await;
        root.apply_depth(0, context);

        if site_start.elapsed() > self.policy.site_budget {
            info!(
                "site budget spent on root {} ({}ms); skipping children",
                url,
                site_start.elapsed().as_millis()
            );
            return SiteRecord::root_only(root);
        }
        if root.is_transcript || self.policy.max_children == 0 {
            return SiteRecord::root_only(root);
        }

        let links = extract_links(&root.raw_content, url, self.policy.domain_match);
        let sublink_start = Instant::now();
        let mut children = Vec::new();

        for link in links {
            if children.len() >= self.policy.max_children {
                break;
            }
            if site_start.elapsed() >= self.policy.site_budget {
                debug!("site budget reached for {} after {} children", url, children.len());
                break;
            }
            if sublink_start.elapsed() >= self.policy.sublink_budget {
                debug!("sub-link budget reached for {} after {} children", url, children.len());
                break;
            }
            if is_transcript_url(&link) {
                continue;
            }

            let mut child = self.analyzer.analyze_with(&link, counter).await;
            child.apply_depth(MAX_CRAWL_DEPTH, context);
            children.push(child);
        }

        debug!(
            "crawled {} with {} children in {}ms",
            url,
            children.len(),
            site_start.elapsed().as_millis()
        );
        SiteRecord { root, children }
    }

    /// Crawls several roots concurrently; output order matches `urls`.
    ///
    /// The futures live inside the returned future, so dropping it cancels
    /// every fetch still in flight.
    pub async fn crawl_sites(&self, urls: &[String], context: &QueryContext) -> Vec<SiteRecord> {
        let started = Instant::now();
        let counter = KeywordCounter::new(&context.counting_keywords());
        let counter = &counter;
        let sites: Vec<SiteRecord> = stream::iter(urls.to_vec())
            .map(|url: String| async move { self.crawl_site_with(&url, context, counter).await })
            .buffered(self.policy.max_concurrent_sites.max(1))
            .collect()
            .await;

        info!(
            "crawl completed: {} sites, {} pages, {}ms total",
            sites.len(),
            sites.iter().map(|s| 1 + s.children.len()).sum::<usize>(),
            started.elapsed().as_millis()
        );
        sites
    }
}
