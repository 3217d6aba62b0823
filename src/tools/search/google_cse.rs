use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{dedupe_hits, SearchProvider};
use crate::core::config::ProviderSection;
use crate::core::error::ProviderError;
use crate::core::types::SearchHit;

pub const DEFAULT_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API returns at most this many items per request.
pub const MAX_RESULTS_PER_REQUEST: usize = 10;

/// Phrase appended to steer results toward the standards body.
pub const BIAS_PHRASE: &str = "International Organization of Standardization";

const BIAS_TRIGGERS: &[&str] = &["iso", "standard", "international", "organization"];

/// When the bias phrase is appended to outgoing queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryBias {
    /// Only when the query already mentions a trigger term.
    #[default]
    Auto,
    Always,
    Never,
}

/// `text` with the bias phrase appended per `bias`; never appended twice.
pub fn biased_query(text: &str, bias: QueryBias) -> String {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if lower.contains(&BIAS_PHRASE.to_lowercase()) {
        return trimmed.to_string();
    }
    let append = match bias {
        QueryBias::Never => false,
        QueryBias::Always => true,
        QueryBias::Auto => BIAS_TRIGGERS.iter().any(|t| lower.contains(t)),
    };
    if append {
        format!("{} {}", trimmed, BIAS_PHRASE)
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct CseEnvelope {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}

/// Google Custom Search JSON API adapter.
pub struct GoogleCseProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    cx: Option<String>,
    endpoint: String,
    bias: QueryBias,
}

impl GoogleCseProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        cx: Option<String>,
        endpoint: impl Into<String>,
        bias: QueryBias,
    ) -> Self {
        Self {
            client,
            api_key,
            cx,
            endpoint: endpoint.into(),
            bias,
        }
    }

    /// Credentials from the config file, falling back to `GOOGLE_CSE_APIKEY` / `GOOGLE_CSE_CX`.
    pub fn from_config(client: reqwest::Client, section: &ProviderSection) -> Self {
        Self::new(
            client,
            section.resolve_api_key(),
            section.resolve_cx(),
            section.resolve_endpoint(),
            section.resolve_query_bias(),
        )
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "missing Google CSE API key (set provider.api_key or GOOGLE_CSE_APIKEY)".to_string(),
                )
            })?;
        let cx = self
            .cx
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "missing Google CSE engine id (set provider.cx or GOOGLE_CSE_CX)".to_string(),
                )
            })?;
        Ok((key, cx))
    }
}

#[async_trait]
impl SearchProvider for GoogleCseProvider {
    fn name(&self) -> &str {
        "google_cse"
    }

    async fn query(&self, text: &str, num_results: usize) -> Result<Vec<SearchHit>, ProviderError> {
        let (key, cx) = self.credentials()?;
        let num = num_results.clamp(1, MAX_RESULTS_PER_REQUEST);
        let q = biased_query(text, self.bias);

        let url = format!(
            "{}?key={}&cx={}&num={}&q={}",
            self.endpoint,
            utf8_percent_encode(key, NON_ALPHANUMERIC),
            utf8_percent_encode(cx, NON_ALPHANUMERIC),
            num,
            utf8_percent_encode(&q, NON_ALPHANUMERIC)
        );
        info!("google_cse query {:?} (num: {})", q, num);

        // without_url(): the request URL carries the API key.
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(ProviderError::Response(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet.trim()
            )));
        }

        let envelope: CseEnvelope = resp
            .json()
            .await
            .map_err(|e| ProviderError::Response(e.without_url().to_string()))?;

        let mut hits = dedupe_hits(
            envelope
                .items
                .into_iter()
                .map(|item| SearchHit {
                    title: item.title.trim().to_string(),
                    url: item.link.trim().to_string(),
                })
                .collect(),
        );
        hits.truncate(num);
        debug!("google_cse returned {} hits", hits.len());
        Ok(hits)
    }
}
