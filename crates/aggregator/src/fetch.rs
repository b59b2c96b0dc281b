//! Timed HTTP fetch with normalized failure reporting

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use coinpeek_core::{FetchError, FetchResult};

/// Seam for issuing JSON GET requests. Backed by reqwest in production
/// and by canned responses in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and decode the body as JSON, failing with `Timeout`
    /// when no response arrives within `timeout`, `Http` for non-2xx
    /// statuses, and `Network` for connection-level failures.
    async fn get_json(&self, url: &str, timeout: Duration) -> FetchResult<Value>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("coinpeek/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, timeout: Duration) -> FetchResult<Value> {
        let timeout_ms = timeout.as_millis() as u64;

        // The deadline covers the whole exchange; expiry drops the
        // timed future and cancels the in-flight request with it.
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout(timeout_ms))?
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = tokio::time::timeout(timeout, response.json::<Value>())
            .await
            .map_err(|_| FetchError::Timeout(timeout_ms))?
            .map_err(|e| FetchError::Network(e.to_string()))?;

        debug!(%url, "fetched JSON body");
        Ok(body)
    }
}
