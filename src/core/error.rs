use thiserror::Error;

/// Failures of the external search provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials or endpoint are missing. Never retried.
    #[error("search provider is not configured: {0}")]
    NotConfigured(String),

    #[error("search provider request failed: {0}")]
    Request(String),

    #[error("search provider returned an unexpected response: {0}")]
    Response(String),
}

/// Errors that abort a whole search call.
///
/// Page-level fetch failures never show up here; they degrade to empty
/// content inside the crawl.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Stable machine-readable label used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Configuration(_) => "configuration",
            SearchError::Provider(_) => "provider",
            SearchError::InvalidQuery(_) => "invalid_query",
        }
    }
}

impl From<ProviderError> for SearchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => SearchError::Configuration(msg),
            other => SearchError::Provider(other),
        }
    }
}
