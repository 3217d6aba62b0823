use async_trait::async_trait;

use crate::core::error::ProviderError;
use crate::core::types::SearchHit;

/// External ranked-search API: query text in, ordered (title, url) candidates out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with [`ProviderError::NotConfigured`] when credentials are missing.
    async fn query(&self, text: &str, num_results: usize) -> Result<Vec<SearchHit>, ProviderError>;
}
