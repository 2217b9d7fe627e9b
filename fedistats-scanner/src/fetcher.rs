use crate::error::{FetchFailure, FetchResult, Result};
use crate::json::JsonExtractor;
use crate::result::{NodeInfo, NodeInfoResourceType, Peers};
use crate::transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const WELL_KNOWN_NODEINFO_PATH: &str = "/.well-known/nodeinfo";
pub const MASTODON_PEERS_PATH: &str = "/api/v1/instance/peers";
pub const LEMMY_PEERS_PATH: &str = "/api/v3/federated_instances";

/// The only software whose peers API differs from Mastodon's.
pub const LEMMY_SOFTWARE_NAME: &str = "lemmy";

const DETAIL_BODY_LIMIT: usize = 100;

/// A JSON document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub url: Url,
    pub data: Value,
}

/// Runs the NodeInfo discovery protocol and the peers APIs against one
/// server at a time. Holds no crawl state.
pub struct Fetcher<T = ReqwestTransport> {
    transport: T,
}

impl Fetcher<ReqwestTransport> {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new(timeout)?))
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Result<Self> {
        Self::new(Duration::from_secs(timeout_secs))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Resolve `/.well-known/nodeinfo` on `base_url` and fetch the first
    /// linked resource with a recognized schema.
    pub async fn fetch_nodeinfo(&self, base_url: &Url) -> FetchResult<NodeInfo> {
        let wellknown_url = join(base_url, WELL_KNOWN_NODEINFO_PATH)?;
        let wellknown = self.fetch_resource(&wellknown_url).await?;

        let links = JsonExtractor::new(&wellknown.data)
            .field("links")
            .and_then(|l| l.as_array())
            .ok_or_else(|| {
                FetchFailure::not_supported(format!(
                    "Failed to fetch {}: invalid schema.",
                    wellknown_url
                ))
            })?;

        for link in links {
            let Some(href_str) = link.field("href").and_then(|h| h.as_str()) else {
                continue;
            };

            let href = match Url::parse(href_str) {
                Ok(href) => href,
                Err(e) => {
                    debug!("Failed to parse href {:?} on {}: {}", href_str, wellknown_url, e);
                    continue;
                }
            };

            let rel = link.field("rel").and_then(|r| r.as_str());
            match rel.and_then(NodeInfoResourceType::from_rel) {
                Some(resource_type) => return self.fetch_raw_nodeinfo(&href, resource_type).await,
                None => debug!("Unsupported rel {:?} on {}", rel, wellknown_url),
            }
        }

        Err(FetchFailure::not_supported(format!(
            "Supported resources are not available on {}.",
            wellknown_url
        )))
    }

    /// Enumerate the peers of a server, choosing the API dialect from the
    /// software name reported in its NodeInfo.
    pub async fn fetch_peers(&self, base_url: &Url, software_name: Option<&str>) -> FetchResult<Peers> {
        match software_name {
            Some(LEMMY_SOFTWARE_NAME) => self.fetch_peers_lemmy(base_url).await,
            _ => self.fetch_peers_mastodon(base_url).await,
        }
    }

    async fn fetch_raw_nodeinfo(
        &self,
        url: &Url,
        resource_type: NodeInfoResourceType,
    ) -> FetchResult<NodeInfo> {
        let resource = self.fetch_resource(url).await?;
        Ok(extract_nodeinfo(
            JsonExtractor::new(&resource.data),
            resource_type,
            resource.url,
        ))
    }

    // https://docs.joinmastodon.org/methods/instance/#peers
    async fn fetch_peers_mastodon(&self, base_url: &Url) -> FetchResult<Peers> {
        let url = join(base_url, MASTODON_PEERS_PATH)?;
        let resource = self.fetch_resource(&url).await?;

        let entries = JsonExtractor::new(&resource.data).as_array().ok_or_else(|| {
            FetchFailure::not_supported("The peers API is not compatible with the Mastodon API.")
        })?;

        // Bare hostnames (Mastodon) or objects with a domain (GoToSocial).
        let hosts = entries
            .iter()
            .filter_map(|x| {
                x.as_str()
                    .or_else(|| x.field("domain").and_then(|d| d.as_str()))
                    .map(str::to_string)
            })
            .collect();

        Ok(Peers { hosts })
    }

    async fn fetch_peers_lemmy(&self, base_url: &Url) -> FetchResult<Peers> {
        let url = join(base_url, LEMMY_PEERS_PATH)?;
        let resource = self.fetch_resource(&url).await?;

        let linked = JsonExtractor::new(&resource.data)
            .path(&["federated_instances", "linked"])
            .and_then(|l| l.as_array())
            .ok_or_else(|| {
                FetchFailure::not_supported("The peers API is not compatible with the Lemmy API.")
            })?;

        let hosts = linked
            .iter()
            .filter_map(|x| x.field("domain").and_then(|d| d.as_str()))
            .map(str::to_string)
            .collect();

        Ok(Peers { hosts })
    }

    async fn fetch_resource(&self, url: &Url) -> FetchResult<FetchedResource> {
        classify_response(url, self.transport.get(url).await)
    }
}

/// Map a raw GET outcome onto the fetch taxonomy.
pub fn classify_response(
    url: &Url,
    response: std::result::Result<HttpResponse, TransportError>,
) -> FetchResult<FetchedResource> {
    let response = response
        .map_err(|e| FetchFailure::unknown(format!("Failed to fetch {}: {}", url, e)))?;

    match response.status {
        200..=299 => {}
        410 => {
            return Err(FetchFailure::gone(format!(
                "Failed to fetch {}: the resource is gone.",
                url
            )));
        }
        400 | 404 | 405 => {
            return Err(FetchFailure::not_supported(format!(
                "Failed to fetch {}: the resource is not available.",
                url
            )));
        }
        300 => {
            return Err(FetchFailure::not_supported(format!(
                "Failed to fetch {}: multiple resources are not supported.",
                url
            )));
        }
        status => {
            return Err(FetchFailure::unknown(format!(
                "Failed to fetch {}: invalid status={}, detail={}",
                url,
                status,
                truncate_detail(&response.body)
            )));
        }
    }

    if response.content_type.as_deref().is_some_and(is_html) {
        return Err(json_not_available(url));
    }

    let data: Value = serde_json::from_str(&response.body).map_err(|e| {
        debug!("Failed to parse JSON from {}: {}", url, e);
        json_not_available(url)
    })?;

    Ok(FetchedResource {
        url: response.url,
        data,
    })
}

fn extract_nodeinfo(
    data: JsonExtractor<'_>,
    resource_type: NodeInfoResourceType,
    resource_url: Url,
) -> NodeInfo {
    let string = |path: &[&str]| data.path(path).and_then(|x| x.as_str()).map(str::to_string);
    let strings = |path: &[&str]| data.path(path).map(|x| x.string_elements());
    let number = |path: &[&str]| data.path(path).and_then(|x| x.as_number()).cloned();
    let boolean = |path: &[&str]| data.path(path).and_then(|x| x.as_bool());

    NodeInfo {
        resource_type,
        resource_url,

        node_name: string(&["metadata", "nodeName"]),

        protocols: strings(&["protocols"]),
        services_inbound: strings(&["services", "inbound"]),
        services_outbound: strings(&["services", "outbound"]),

        software_name: string(&["software", "name"]),
        software_version: string(&["software", "version"]),
        software_repository: string(&["software", "repository"]),

        users_total: number(&["usage", "users", "total"]),
        users_active_month: number(&["usage", "users", "activeMonth"]),
        users_active_half_year: number(&["usage", "users", "activeHalfyear"]),
        local_posts_total: number(&["usage", "localPosts"]),
        local_comments_total: number(&["usage", "localComments"]),

        maintainer_name: string(&["metadata", "maintainer", "name"]),
        open_registrations: boolean(&["openRegistrations"]),
        email_required_for_signup: boolean(&["metadata", "emailRequiredForSignup"]),
        enable_email: boolean(&["metadata", "enableEmail"]),
        enable_hcaptcha: boolean(&["metadata", "enableHcaptcha"]),
        enable_recaptcha: boolean(&["metadata", "enableRecaptcha"]),

        langs: strings(&["metadata", "langs"]),
        max_note_text_length: number(&["metadata", "maxNoteTextLength"]),
    }
}

fn join(base_url: &Url, path: &str) -> FetchResult<Url> {
    base_url.join(path).map_err(|e| {
        FetchFailure::unknown(format!("Failed to build {} on {}: {}", path, base_url, e))
    })
}

fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
}

fn json_not_available(url: &Url) -> FetchFailure {
    FetchFailure::not_supported(format!("JSON resources are not available on {}.", url))
}

fn truncate_detail(body: &str) -> String {
    match body.char_indices().nth(DETAIL_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
