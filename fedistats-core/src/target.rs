// Crawl targets, endpoints and exclusion rules

use serde::{Deserialize, Serialize};
use url::Url;

/// A target that parses as `https://<target>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTarget {
    /// The raw string as seeded or discovered. Queue dedup uses this.
    pub target: String,
    /// Origin of the target with a root path.
    pub base_url: Url,
}

/// Parse a raw hostname (optionally with port). `None` if it is not a
/// well-formed origin.
pub fn validate_target(target: &str) -> Option<ValidTarget> {
    let url = Url::parse(&format!("https://{}", target)).ok()?;
    url.host_str()?;

    Some(ValidTarget {
        target: target.to_string(),
        base_url: endpoint_by_resource_url(&url),
    })
}

/// Canonical endpoint for any URL served by a server: its origin with a
/// root path and no query or fragment.
pub fn endpoint_by_resource_url(url: &Url) -> Url {
    let mut endpoint = url.clone();
    endpoint.set_path("/");
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    endpoint
}

/// A persisted exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NgFilter {
    /// Drops strict subdomains of `main_domain`; the domain itself passes.
    Subdomain { main_domain: String },
    /// Rule kinds this version does not know. Never match.
    #[serde(other)]
    Unsupported,
}

impl NgFilter {
    pub fn matches(&self, hostname: &str) -> bool {
        match self {
            NgFilter::Subdomain { main_domain } => {
                let suffix = format!(".{}", main_domain.to_ascii_lowercase());
                hostname.ends_with(&suffix)
            }
            NgFilter::Unsupported => false,
        }
    }
}

pub fn is_ng_target(target: &ValidTarget, ng_list: &[NgFilter]) -> bool {
    let Some(hostname) = target.base_url.host_str() else {
        return false;
    };
    ng_list.iter().any(|filter| filter.matches(hostname))
}
