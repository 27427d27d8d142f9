//! Audio locator: turns a per-track media reference into a concrete URL.
//!
//! One header-only probe per track, issued while a format directory is
//! populated. Reads never probe.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument};

use crate::catalog::{UpstreamError, UpstreamResult};

/// What a probe learned about one track's media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    /// Final URL after following redirects.
    pub url: String,
    /// Declared content length; 0 when the host did not say.
    pub size: u64,
    pub content_type: Option<String>,
}

impl MediaInfo {
    /// Stand-in for a reference that could not be probed.
    pub fn unprobed(reference: impl Into<String>) -> Self {
        Self {
            url: reference.into(),
            size: 0,
            content_type: None,
        }
    }
}

/// Resolves media references without downloading bodies.
#[async_trait]
pub trait AudioLocator: Send + Sync {
    async fn probe(&self, reference: &str) -> UpstreamResult<MediaInfo>;
}

/// HEAD-based locator. Redirects are followed by the client.
#[derive(Debug, Clone)]
pub struct HttpLocator {
    http: reqwest::Client,
}

impl HttpLocator {
    pub fn new(user_agent: &str) -> UpstreamResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AudioLocator for HttpLocator {
    #[instrument(skip(self), fields(reference = %reference))]
    async fn probe(&self, reference: &str) -> UpstreamResult<MediaInfo> {
        let response = self.http.head(reference).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(response.url().as_str(), status.as_u16()));
        }

        let headers = response.headers();
        // The body of a HEAD response is empty, so the header is the only
        // source of the length.
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let info = MediaInfo {
            url: response.url().to_string(),
            size,
            content_type,
        };
        debug!(url = %info.url, size = info.size, "probed media");
        Ok(info)
    }
}
