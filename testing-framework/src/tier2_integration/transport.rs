//! HttpTransport - JSON-RPC over HTTP to a running node
//!
//! The only transport that leaves the process. It posts the request envelope
//! to the node's RPC endpoint and decodes whatever JSON comes back.

use super::{RpcRequest, RpcResponse, RpcTransport};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC transport backed by `reqwest`
///
/// # Example
///
/// ```rust,ignore
/// let transport = HttpTransport::new("http://127.0.0.1:3030")
///     .with_timeout(Duration::from_secs(2));
/// let body = transport.post_raw(&RpcRequest::new("probe", "status", json!([]))).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport to `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_RPC_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Post `request` and return the decoded body as-is
    ///
    /// # Errors
    ///
    /// Returns `TestingError::Http` on connection failures, timeouts and
    /// bodies that are not JSON.
    pub async fn post_raw(&self, request: &RpcRequest) -> Result<Value> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("POST {} method={} params={}", self.url, request.method, request.params);
        }

        let body = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?
            .json::<Value>()
            .await?;

        Ok(body)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let body = self.post_raw(request).await?;
        Ok(serde_json::from_value(body)?)
    }
}
