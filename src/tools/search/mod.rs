pub mod google_cse;
mod service;

use std::collections::HashSet;
use url::Url;

use crate::core::types::SearchHit;

pub use google_cse::{GoogleCseProvider, QueryBias};
pub use service::SearchProvider;

/// Dedupe key for result URLs: fragment dropped, lower-cased, no trailing slash.
pub fn normalize_url_key(url: &str) -> String {
    let mut key = match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    };
    if key.ends_with('/') && key.len() > 1 {
        key.pop();
    }
    key.to_lowercase()
}

/// Drops hits without a usable URL and later duplicates of the same URL.
pub fn dedupe_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| !h.url.trim().is_empty())
        .filter(|h| seen.insert(normalize_url_key(&h.url)))
        .collect()
}
