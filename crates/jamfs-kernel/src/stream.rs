//! Streaming reader for resolved media URLs.
//!
//! Media players read a track in many small chunks. Reconnecting for each
//! one stalls playback, so every worker thread keeps one long-lived
//! connection, created on its first read and reused afterwards. All of
//! them live in a process-wide [`ConnectionPool`] so shutdown can release
//! them.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::catalog::{UpstreamError, UpstreamResult};

/// Idle keep-alive for per-thread connections.
const KEEPALIVE: Duration = Duration::from_secs(60);

/// Byte-range transport.
#[async_trait]
pub trait RangeFetch: Send + Sync {
    /// Fetch bytes `[offset, offset + len - 1]` of `url`. May return fewer.
    async fn fetch_range(&self, url: &str, offset: u64, len: u32) -> UpstreamResult<Bytes>;

    /// Drop every cached connection. Returns how many were released.
    fn release_all(&self) -> usize {
        0
    }
}

/// One HTTP client per worker thread, keyed by thread id.
///
/// A thread only ever pulls its own client, so no connection is shared
/// between concurrent reads on different threads.
pub struct ConnectionPool {
    clients: DashMap<ThreadId, reqwest::Client>,
    user_agent: String,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connections", &self.clients.len())
            .finish()
    }
}

impl ConnectionPool {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            clients: DashMap::new(),
            user_agent: user_agent.into(),
        }
    }

    /// The calling thread's client, created on first use.
    pub fn for_current_thread(&self) -> UpstreamResult<reqwest::Client> {
        let id = thread::current().id();
        if let Some(client) = self.clients.get(&id) {
            return Ok(client.clone());
        }

        let client = self.build_client()?;
        debug!(thread = ?id, "created stream connection");
        Ok(self.clients.entry(id).or_insert(client).clone())
    }

    /// Number of live per-thread connections.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Release every connection. Later reads reconnect lazily.
    pub fn release_all(&self) -> usize {
        let released = self.clients.len();
        self.clients.clear();
        released
    }

    fn build_client(&self) -> UpstreamResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(KEEPALIVE)
            .tcp_keepalive(KEEPALIVE)
            .build()?)
    }
}

/// Ranged GETs over the per-thread [`ConnectionPool`].
#[derive(Debug)]
pub struct HttpRangeFetch {
    pool: ConnectionPool,
}

impl HttpRangeFetch {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            pool: ConnectionPool::new(user_agent),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl RangeFetch for HttpRangeFetch {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_range(&self, url: &str, offset: u64, len: u32) -> UpstreamResult<Bytes> {
        if len == 0 {
            return Ok(Bytes::new());
        }
        let last = offset + u64::from(len) - 1;
        debug!("requesting bytes [{}-{}]", offset, last);

        let client = self.pool.for_current_thread()?;
        let response = client
            .get(url)
            .header(RANGE, format!("bytes={offset}-{last}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(url, status.as_u16()));
        }

        let body = response.bytes().await?;
        // A host that ignores Range answers 200 with the whole body.
        let body = if status == StatusCode::OK {
            let start = usize::try_from(offset).unwrap_or(usize::MAX).min(body.len());
            body.slice(start..)
        } else {
            body
        };
        let keep = body.len().min(len as usize);
        Ok(body.slice(..keep))
    }

    fn release_all(&self) -> usize {
        self.pool.release_all()
    }
}

/// Serves byte ranges of resolved media.
#[derive(Clone)]
pub struct StreamReader {
    fetch: Arc<dyn RangeFetch>,
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader").finish_non_exhaustive()
    }
}

impl StreamReader {
    pub fn new(fetch: Arc<dyn RangeFetch>) -> Self {
        Self { fetch }
    }

    /// HTTP reader with a fresh connection pool.
    pub fn http(user_agent: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpRangeFetch::new(user_agent)))
    }

    /// Read up to `len` bytes at `offset` of a stream of `known_size` bytes.
    ///
    /// At or past EOF this returns nothing without touching the network.
    /// Short reads are passed through.
    pub async fn read(
        &self,
        url: &str,
        known_size: u64,
        offset: u64,
        len: u32,
    ) -> UpstreamResult<Bytes> {
        if offset >= known_size || len == 0 {
            return Ok(Bytes::new());
        }
        let remaining = u32::try_from(known_size - offset).unwrap_or(u32::MAX);
        self.fetch.fetch_range(url, offset, len.min(remaining)).await
    }

    /// Release every per-thread connection.
    pub fn shutdown(&self) -> usize {
        self.fetch.release_all()
    }
}
