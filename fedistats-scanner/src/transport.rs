use crate::error::Result;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// What the fetcher needs from a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after any redirects the transport followed.
    pub url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

/// DNS, connect, TLS, timeout or body read failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Perform a GET asking for JSON.
pub trait Transport {
    fn get(&self, url: &Url) -> impl Future<Output = std::result::Result<HttpResponse, TransportError>> + Send;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// `timeout` bounds the whole request, redirects included.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fedistats/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError(error_chain(&e)))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| TransportError(error_chain(&e)))?;

        Ok(HttpResponse {
            status,
            url: final_url,
            content_type,
            body,
        })
    }
}

// reqwest's Display omits the underlying cause (e.g. "connection refused").
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
