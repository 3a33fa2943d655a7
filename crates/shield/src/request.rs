//! Request classification.
//!
//! Derives the fields the matching path needs (host, path+query,
//! normalized resource type, third-party bit) from the raw URL strings
//! the browser engine hands us.

use sg_adblock::ResourceType;
use sg_domain::{Error, Result};
use url::Url;

/// One outgoing request, as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    pub url: String,
    pub host: String,
    /// Path plus `'?'` plus query, the shape path predicates expect.
    pub path: String,
    pub resource_type: ResourceType,
    pub page_url: Option<String>,
    pub is_third_party: bool,
    pub method: String,
}

impl InterceptRequest {
    /// Parse a raw URL and derive the matching fields. `resource_type`
    /// is whatever the engine reports; unknown values normalize to
    /// `other`.
    pub fn derive(
        url: &str,
        resource_type: &str,
        page_url: Option<&str>,
        method: &str,
    ) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| Error::Other(format!("unparseable url {url:?}: {e}")))?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        let mut path = parsed.path().to_owned();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        let is_third_party = match page_url {
            Some(page) => {
                let page_host = Url::parse(page)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
                match page_host {
                    Some(ph) => registrable_domain(&host) != registrable_domain(&ph),
                    None => false,
                }
            }
            None => false,
        };

        Ok(Self {
            url: url.to_owned(),
            host,
            path,
            resource_type: ResourceType::from_wire(resource_type),
            page_url: page_url.map(str::to_owned),
            is_third_party,
            method: method.to_ascii_uppercase(),
        })
    }
}

/// Simplified eTLD+1: the last two DNS labels. Misclassifies
/// country-coded second-level domains like `co.uk`; a production
/// deployment should swap in a public-suffix-list lookup.
pub fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.rsplit('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_owned(),
        _ => format!("{}.{}", labels[1], labels[0]),
    }
}
