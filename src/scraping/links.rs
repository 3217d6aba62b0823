use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// How two hosts are compared when deciding whether a link stays on-site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMatch {
    /// Host strings must be identical: `www.iso.org` and `iso.org` differ.
    #[default]
    Exact,
    /// A single leading `www.` is ignored on both sides.
    IgnoreWww,
}

impl DomainMatch {
    pub fn same_host(&self, a: &str, b: &str) -> bool {
        let a = a.to_ascii_lowercase();
        let b = b.to_ascii_lowercase();
        match self {
            DomainMatch::Exact => a == b,
            DomainMatch::IgnoreWww => strip_www(&a) == strip_www(&b),
        }
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Drops query string and fragment.
fn strip_query(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn is_skipped_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

/// Same-domain absolute links found in `html`, in first-seen document order.
///
/// Relative hrefs resolve against `base_url`; query strings and fragments are
/// stripped before de-duplication; the base page itself is never returned.
/// Unparseable hrefs are dropped.
pub fn extract_links(html: &str, base_url: &str, policy: DomainMatch) -> Vec<String> {
    let base = match Url::parse(base_url) {
        Ok(u) => u,
        Err(e) => {
            debug!("cannot extract links: bad base url {}: {}", base_url, e);
            return Vec::new();
        }
    };
    let Some(base_host) = base.host_str().map(str::to_string) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let self_url = strip_query(base.clone()).to_string();
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if is_skipped_href(href) {
            continue;
        }

        let resolved = match base.join(href) {
            Ok(u) => u,
            Err(e) => {
                debug!("dropping malformed link {:?} on {}: {}", href, base_url, e);
                continue;
            }
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let same_site = resolved
            .host_str()
            .is_some_and(|h| policy.same_host(h, &base_host));
        if !same_site {
            continue;
        }

        let absolute = strip_query(resolved).to_string();
        if absolute == self_url {
            continue;
        }
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}
