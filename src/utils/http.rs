//! HTTP client utilities.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{FetchOutcome, Transport};
use crate::sources::{Fetcher, SourceError};

/// Rendering proxy used to retry forbidden requests.
///
/// The proxy fetches the target server-side; the target URL is appended verbatim.
pub const DEFAULT_BYPASS_PROXY: &str = "https://r.jina.ai/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser identities rotated per attempt. Some mirrors block per identity.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/115.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/15.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/112.0 Safari/537.36",
];

/// Shared HTTP client with identity rotation and a one-shot bypass retry
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    user_agents: Vec<String>,
    bypass_proxy: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::from_client(Arc::new(client)))
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self {
            client,
            user_agents: USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            bypass_proxy: Some(DEFAULT_BYPASS_PROXY.to_string()),
        }
    }

    /// Replace the identity pool. An empty pool keeps the client default.
    pub fn user_agents(mut self, agents: Vec<String>) -> Self {
        self.user_agents = agents;
        self
    }

    /// Set or disable the bypass proxy
    pub fn bypass_proxy(mut self, proxy: Option<String>) -> Self {
        self.bypass_proxy = proxy.map(|p| {
            if p.ends_with('/') {
                p
            } else {
                format!("{}/", p)
            }
        });
        self
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Proxy form of a URL, if a bypass proxy is configured
    pub fn proxied_url(&self, url: &str) -> Option<String> {
        self.bypass_proxy
            .as_ref()
            .map(|proxy| format!("{}{}", proxy, url))
    }

    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        transport: Transport,
    ) -> Result<FetchOutcome, SourceError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transport(format!("Reading {} failed: {}", url, e)))?;

        Ok(FetchOutcome {
            url: url.to_string(),
            status,
            body: body.to_vec(),
            content_type,
            transport,
        })
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(agent) = self.user_agents.choose(&mut rand::rng()) {
            if let Ok(value) = HeaderValue::from_str(agent) {
                headers.insert(USER_AGENT, value);
            }
        }
        headers
    }

    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<FetchOutcome, SourceError> {
        let outcome = self.get(url, headers, Transport::Direct).await?;

        if outcome.status != 403 {
            return Ok(outcome);
        }

        match self.proxied_url(url) {
            Some(proxied) => {
                tracing::debug!("{} returned 403, retrying through {}", url, proxied);
                self.get(&proxied, headers, Transport::BypassProxy).await
            }
            None => Ok(outcome),
        }
    }
}
