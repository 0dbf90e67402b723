//! RPC client helpers for integration testing
//!
//! `RpcClient` is the call surface code under test talks to. It owns a
//! swappable transport: HTTP to a sandbox in integration tests, a
//! `MockDispatcher` in component tests (see `InterceptorGuard`).

use super::{HttpTransport, RpcRequest, RpcTransport};
use crate::error::{Result, TestingError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Request id sent with every client request
pub const DEFAULT_REQUEST_ID: &str = "near-testing";

/// Account state as returned by `query` / `view_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    /// Liquid balance in yoctoNEAR (decimal string)
    pub amount: String,
    /// Staked balance in yoctoNEAR (decimal string)
    #[serde(default)]
    pub locked: String,
    /// Hash of the deployed code
    #[serde(default)]
    pub code_hash: String,
    /// Storage used by the account, in bytes
    #[serde(default)]
    pub storage_usage: u64,
    /// Height the view was taken at
    #[serde(default)]
    pub block_height: u64,
    /// Hash of the block the view was taken at
    #[serde(default)]
    pub block_hash: String,
}

impl AccountView {
    /// Liquid balance as a number
    ///
    /// # Errors
    ///
    /// Returns `TestingError::InvalidAmount` if `amount` is not a decimal
    /// integer.
    pub fn amount_yocto(&self) -> Result<u128> {
        self.amount
            .parse()
            .map_err(|_| TestingError::InvalidAmount(self.amount.clone()))
    }
}

/// JSON-RPC client with an injectable transport
///
/// # Example
///
/// ```rust,ignore
/// let client = RpcClient::http("http://127.0.0.1:3030");
/// let account = client.view_account("alice.test.near").await?;
/// let greeting = client
///     .view_function("hello.test.near", "get_greeting", &json!({}))
///     .await?;
/// ```
pub struct RpcClient {
    transport: RwLock<Arc<dyn RpcTransport>>,
    request_id: String,
}

impl RpcClient {
    /// Client over an arbitrary transport
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport: RwLock::new(transport),
            request_id: DEFAULT_REQUEST_ID.to_string(),
        }
    }

    /// Client over HTTP to `url`
    pub fn http(url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(url)))
    }

    /// Override the request id
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Transport currently in use
    pub fn transport(&self) -> Arc<dyn RpcTransport> {
        self.transport.read().clone()
    }

    /// Swap in `transport` until the returned guard is dropped
    ///
    /// The previous transport comes back when the guard goes out of scope,
    /// including during unwinding after a failed assertion.
    pub fn intercept(&self, transport: Arc<dyn RpcTransport>) -> InterceptorGuard<'_> {
        let previous = std::mem::replace(&mut *self.transport.write(), transport);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("RPC transport intercepted");
        }

        InterceptorGuard {
            client: self,
            previous: Some(previous),
        }
    }

    /// Issue one JSON-RPC call and return its `result`
    ///
    /// # Errors
    ///
    /// * `TestingError::Rpc` if the server answered with an error
    /// * Transport errors (`Http`, `Json`) as reported by the transport
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest::new(self.request_id.clone(), method, params);
        // Clone the Arc so the lock is not held across the await
        let transport = self.transport();
        transport.send(&request).await?.into_result()
    }

    /// `query` call
    pub async fn query(&self, params: Value) -> Result<Value> {
        self.call("query", params).await
    }

    /// `status` call
    pub async fn status(&self) -> Result<Value> {
        self.call("status", json!([])).await
    }

    /// View an account's state
    pub async fn view_account(&self, account_id: &str) -> Result<AccountView> {
        let result = self
            .query(json!({
                "request_type": "view_account",
                "finality": "final",
                "account_id": account_id,
            }))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Call a view function and decode its return value
    ///
    /// `args` is sent JSON-encoded as `args_base64`. The result bytes are
    /// decoded as JSON when possible, otherwise returned as a string.
    pub async fn view_function(&self, contract: &str, method: &str, args: &Value) -> Result<Value> {
        let args_base64 = STANDARD.encode(serde_json::to_vec(args)?);
        let result = self
            .query(json!({
                "request_type": "call_function",
                "finality": "final",
                "account_id": contract,
                "method_name": method,
                "args_base64": args_base64,
            }))
            .await?;

        let bytes = result_bytes(&result)?;
        Ok(serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
    }
}

/// Decode the `result` byte list of a `call_function` response
fn result_bytes(result: &Value) -> Result<Vec<u8>> {
    let malformed = || TestingError::Rpc(format!("malformed call_function result: {}", result));

    result
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(malformed)?
        .iter()
        .map(|b| {
            b.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(malformed)
        })
        .collect()
}

/// Restores a client's previous transport when dropped
///
/// Returned by [`RpcClient::intercept`] and `MockDispatcher::install`.
#[must_use = "the interception ends as soon as the guard is dropped"]
pub struct InterceptorGuard<'a> {
    client: &'a RpcClient,
    previous: Option<Arc<dyn RpcTransport>>,
}

impl Drop for InterceptorGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.client.transport.write() = previous;

            if log::log_enabled!(log::Level::Debug) {
                log::debug!("RPC transport restored");
            }
        }
    }
}
