// File: testing-framework/src/tier2_integration/mod.rs
//
// Tier 2 Integration Testing Components
//
// This module provides the sandbox node lifecycle and the RPC layer used to
// talk to it: JSON-RPC wire types, the injectable transport seam, the HTTP
// transport and a typed client on top.

pub mod builder;
pub mod rpc_helpers;
pub mod sandbox;
/// HTTP transport to a live node
pub mod transport;

// Re-export main types for convenience
pub use builder::{SandboxBuilder, SandboxConfig, DEFAULT_RPC_PORT};
pub use rpc_helpers::{AccountView, InterceptorGuard, RpcClient};
pub use sandbox::{free_local_port, run_in_sandbox, ProcessSandbox, SandboxFuture, SandboxState};
pub use transport::HttpTransport;

use crate::error::{Result, TestingError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Request id, echoed back by the server
    pub id: String,
    /// RPC method (e.g. `"query"`, `"status"`)
    pub method: String,
    /// Method params
    pub params: Value,
}

impl RpcRequest {
    /// Build a request with the given id
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Numeric error code, if the server sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Additional error data, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC response envelope: either `result` or `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version echoed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    /// Request id echoed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Successful result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Successful response to `request`
    pub fn success(request: &RpcRequest, result: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(Value::String(request.id.clone())),
            result: Some(result),
            error: None,
        }
    }

    /// Error response to `request`
    pub fn failure(request: &RpcRequest, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(Value::String(request.id.clone())),
            result: None,
            error: Some(RpcErrorObject {
                message: message.into(),
                code: None,
                data: None,
            }),
        }
    }

    /// Turn the envelope into its result
    ///
    /// # Errors
    ///
    /// Returns `TestingError::Rpc` carrying the error message when the server
    /// answered with an error, or when the envelope has neither field.
    pub fn into_result(self) -> Result<Value> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(TestingError::Rpc(error.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(TestingError::Rpc(
                "response carries neither result nor error".to_string(),
            )),
        }
    }
}

/// Single "send request" capability that RPC-issuing code depends on.
///
/// Production code talks to a node through an [`RpcClient`], which holds an
/// `RpcTransport`. Tests substitute a mock implementation for a bounded
/// scope instead of patching any global symbol.
///
/// # Implementation Note
///
/// Implementations report JSON-RPC level failures inside the returned
/// `RpcResponse`; `Err` is reserved for transport failures (connection
/// refused, malformed body, timeouts).
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send one request and return the decoded response envelope
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse>;
}
