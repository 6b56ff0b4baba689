//! Feed fetching.
//!
//! Provides the interface the engine uses to download the feed document,
//! with an HTTP implementation and a static one.

use crate::error::{BlocklistError, NetworkErrorKind, Result};

/// User agent sent with feed requests
pub const USER_AGENT: &str = concat!("url-blocklist-r/", env!("CARGO_PKG_VERSION"));

/// Feed fetcher interface.
pub trait FeedFetcher: Send + Sync {
    /// Download the feed document as text.
    ///
    /// Any transport or HTTP failure is reported as
    /// [`BlocklistError::Network`].
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP(S) fetcher.
pub struct HttpFeedFetcher {
    agent: ureq::Agent,
}

impl HttpFeedFetcher {
    /// Create a fetcher with a default agent.
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Create a fetcher using a preconfigured agent (proxy, timeouts, TLS).
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(err: &ureq::Error) -> NetworkErrorKind {
    match err {
        ureq::Error::StatusCode(_) => NetworkErrorKind::Status,
        ureq::Error::Timeout(_) => NetworkErrorKind::Timeout,
        _ => NetworkErrorKind::Transport,
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| {
                BlocklistError::network(classify(&e), format!("GET {} failed: {}", url, e))
            })?;

        response.body_mut().read_to_string().map_err(|e| {
            BlocklistError::network(
                NetworkErrorKind::Body,
                format!("Failed to read body from {}: {}", url, e),
            )
        })
    }
}

/// Fetcher returning a fixed body, or failing every time.
pub struct StaticFeedFetcher {
    body: Option<String>,
}

impl StaticFeedFetcher {
    /// Create a fetcher that always returns `body`.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// Create a fetcher that always fails with a transport error.
    pub fn unreachable() -> Self {
        Self { body: None }
    }
}

impl FeedFetcher for StaticFeedFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.body.clone().ok_or_else(|| {
            BlocklistError::network(
                NetworkErrorKind::Transport,
                format!("{} is unreachable", url),
            )
        })
    }
}
