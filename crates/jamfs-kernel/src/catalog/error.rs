//! Upstream (catalog API and media host) error types.

use thiserror::Error;

/// Failure talking to the catalog API or a media host.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, TLS, redirect or body transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The API answered but reported a failure in its response headers.
    #[error("catalog error {code}: {message}")]
    Api { code: i64, message: String },

    /// Body was not the JSON shape we expect.
    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl UpstreamError {
    /// Create a Status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Create a Decode error.
    pub fn decode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Upstream result type.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
