use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use super::user_agent::{browser_headers, pick_user_agent};

/// Result of one content fetch. Degraded fetches carry the reason, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(String),
    Degraded(String),
}

impl FetchOutcome {
    pub fn ok(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }

    /// The fetched content; empty when degraded.
    pub fn into_content(self) -> String {
        match self {
            FetchOutcome::Fetched(content) => content,
            FetchOutcome::Degraded(_) => String::new(),
        }
    }

    /// Empty or whitespace-only content is itself a failure.
    pub fn from_body(body: String) -> Self {
        if body.trim().is_empty() {
            FetchOutcome::Degraded("empty body".to_string())
        } else {
            FetchOutcome::Fetched(body)
        }
    }
}

/// Raw content source for a URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Transport settings for page fetches.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub rotate_user_agent: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(1_500),
            read_timeout: Duration::from_millis(2_500),
            rotate_user_agent: true,
        }
    }
}

impl FetchSettings {
    /// Client with explicit connect and read timeouts; the whole request is
    /// additionally capped at their sum.
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .timeout(self.connect_timeout + self.read_timeout)
            .build()
    }
}

/// reqwest-backed fetcher. Any transport error, non-2xx status or empty body degrades.
pub struct HttpFetcher {
    client: reqwest::Client,
    outbound_limit: Arc<Semaphore>,
    rotate_user_agent: bool,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, outbound_limit: Arc<Semaphore>, rotate_user_agent: bool) -> Self {
        Self {
            client,
            outbound_limit,
            rotate_user_agent,
        }
    }

    pub fn from_settings(settings: &FetchSettings, outbound_limit: Arc<Semaphore>) -> reqwest::Result<Self> {
        Ok(Self::new(
            settings.build_client()?,
            outbound_limit,
            settings.rotate_user_agent,
        ))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let _permit = match self.outbound_limit.acquire().await {
            Ok(p) => p,
            Err(_) => return FetchOutcome::Degraded("outbound limiter closed".to_string()),
        };

        let mut req = self
            .client
            .get(url)
            .header("User-Agent", pick_user_agent(self.rotate_user_agent));
        for (k, v) in browser_headers() {
            req = req.header(k, v);
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("fetch {} failed: {}", url, e);
                return FetchOutcome::Degraded(e.to_string());
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!("fetch {} returned HTTP {}", url, status);
            return FetchOutcome::Degraded(format!("http {}", status.as_u16()));
        }

        match resp.text().await {
            Ok(body) => FetchOutcome::from_body(body),
            Err(e) => {
                debug!("reading body of {} failed: {}", url, e);
                FetchOutcome::Degraded(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bodies_degrade() {
        assert_eq!(
            FetchOutcome::from_body("  \n".to_string()),
            FetchOutcome::Degraded("empty body".to_string())
        );
        let ok = FetchOutcome::from_body("<p>hi</p>".to_string());
        assert!(ok.ok());
        assert_eq!(ok.into_content(), "<p>hi</p>");
    }

    #[test]
    fn degraded_content_is_empty() {
        let degraded = FetchOutcome::Degraded("timeout".to_string());
        assert!(!degraded.ok());
        assert_eq!(degraded.into_content(), "");
    }

    #[test]
    fn reference_timeouts() {
        let s = FetchSettings::default();
        assert_eq!(s.connect_timeout, Duration::from_millis(1_500));
        assert_eq!(s.read_timeout, Duration::from_millis(2_500));
    }
}
