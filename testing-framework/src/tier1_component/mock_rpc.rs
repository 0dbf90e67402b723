//! MockDispatcher - Deterministic in-process RPC responder
//!
//! Answers RPC-shaped calls from a registry of canned responses and records
//! every call for later assertions. Installed into an `RpcClient` it stands
//! in for a live node, so component tests never need a sandbox.

use crate::assertions::{is_subset, is_subset_of_value};
use crate::error::{Result, TestingError};
use crate::tier2_integration::{InterceptorGuard, RpcClient, RpcRequest, RpcResponse, RpcTransport};
use crate::utilities::amounts::near_to_yocto;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Block height reported by mock account and view responses
pub const MOCK_BLOCK_HEIGHT: u64 = 100_000_000;

/// Block hash reported by mock account responses
pub const MOCK_BLOCK_HASH: &str = "mock_block_hash";

/// Code hash of an account without a contract
pub const EMPTY_CODE_HASH: &str = "11111111111111111111111111111111";

/// Storage usage of a freshly created account
pub const DEFAULT_STORAGE_USAGE: u64 = 182;

/// What a matched entry answers with
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// JSON-RPC `result`
    Result(Value),
    /// Error message surfaced as `TestingError::MockRpc`
    Error(String),
}

/// One registered response
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponseEntry {
    /// RPC method this entry answers
    pub method: String,
    /// Key/value pairs the params must contain; `None` matches any params
    pub matcher: Option<Map<String, Value>>,
    /// Reply returned on match
    pub reply: MockReply,
}

impl MockResponseEntry {
    /// True if this entry answers `method` with `params`
    ///
    /// A matcher only ever matches object params.
    pub fn matches(&self, method: &str, params: &Value) -> bool {
        if self.method != method {
            return false;
        }
        match &self.matcher {
            Some(matcher) => params.is_object() && is_subset_of_value(matcher, params),
            None => true,
        }
    }
}

/// One dispatched call, recorded whatever its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Requested method
    pub method: String,
    /// Requested params (`null` recorded as `{}`)
    pub params: Value,
}

/// Account registered through [`MockDispatcher::add_account_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct MockAccount {
    /// Account id
    pub account_id: String,
    /// Liquid balance in NEAR
    pub balance_near: f64,
    /// Storage used, in bytes
    pub storage_usage: u64,
    /// Code hash
    pub code_hash: String,
    /// Locked balance in yoctoNEAR
    pub locked: String,
}

impl MockAccount {
    /// Account with `balance_near` and default state
    pub fn new(account_id: impl Into<String>, balance_near: f64) -> Self {
        Self {
            account_id: account_id.into(),
            balance_near,
            storage_usage: DEFAULT_STORAGE_USAGE,
            code_hash: EMPTY_CODE_HASH.to_string(),
            locked: "0".to_string(),
        }
    }

    /// Set storage usage
    pub fn with_storage_usage(mut self, storage_usage: u64) -> Self {
        self.storage_usage = storage_usage;
        self
    }

    /// Set code hash
    pub fn with_code_hash(mut self, code_hash: impl Into<String>) -> Self {
        self.code_hash = code_hash.into();
        self
    }

    /// Set locked balance (yoctoNEAR)
    pub fn with_locked(mut self, locked: impl Into<String>) -> Self {
        self.locked = locked.into();
        self
    }
}

#[derive(Debug, Default)]
struct Registry {
    entries: Vec<MockResponseEntry>,
    calls: Vec<CallRecord>,
}

/// In-process RPC responder
///
/// Entries are scanned in registration order and the first match wins, so
/// register specific matchers before catch-all ones. Clones share the same
/// registry and call log.
///
/// # Example
///
/// ```rust,ignore
/// let mock = MockDispatcher::new();
/// mock.add_account("alice.near", 50.0)?
///     .add_view_result("app.near", "get_greeting", &"hello")?;
///
/// let client = RpcClient::http("http://127.0.0.1:3030");
/// {
///     let _guard = mock.install(&client);
///     let account = client.view_account("alice.near").await?;
///     assert_eq!(account.amount, "50000000000000000000000000");
/// }
///
/// mock.assert_called("query", Some(json!({"account_id": "alice.near"}).as_object().unwrap()))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDispatcher {
    inner: Arc<Mutex<Registry>>,
}

impl MockDispatcher {
    /// Empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append an entry
    ///
    /// An empty matcher is the same as no matcher.
    pub fn register(
        &self,
        method: impl Into<String>,
        reply: MockReply,
        matcher: Option<Map<String, Value>>,
    ) -> &Self {
        let entry = MockResponseEntry {
            method: method.into(),
            matcher: matcher.filter(|m| !m.is_empty()),
            reply,
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Registered mock for method={} matcher={:?}",
                entry.method,
                entry.matcher
            );
        }

        self.inner.lock().entries.push(entry);
        self
    }

    /// Answer `method` with `result` for any params
    pub fn add_response(&self, method: impl Into<String>, result: Value) -> &Self {
        self.register(method, MockReply::Result(result), None)
    }

    /// Answer `method` with `result` when params contain `matcher`
    pub fn add_response_matching(
        &self,
        method: impl Into<String>,
        matcher: Map<String, Value>,
        result: Value,
    ) -> &Self {
        self.register(method, MockReply::Result(result), Some(matcher))
    }

    /// Fail `method` with `message`, optionally only when params contain `matcher`
    pub fn add_error(
        &self,
        method: impl Into<String>,
        message: impl Into<String>,
        matcher: Option<Map<String, Value>>,
    ) -> &Self {
        self.register(method, MockReply::Error(message.into()), matcher)
    }

    /// Register a `view_account` answer for `account_id` with default state
    ///
    /// # Errors
    ///
    /// Returns `TestingError::InvalidAmount` for negative or non-finite
    /// balances.
    pub fn add_account(&self, account_id: impl Into<String>, balance_near: f64) -> Result<&Self> {
        self.add_account_with(MockAccount::new(account_id, balance_near))
    }

    /// Register a `view_account` answer for a fully specified account
    pub fn add_account_with(&self, account: MockAccount) -> Result<&Self> {
        let amount = near_to_yocto(account.balance_near)?;

        let result = json!({
            "amount": amount.to_string(),
            "locked": account.locked,
            "code_hash": account.code_hash,
            "storage_usage": account.storage_usage,
            "block_height": MOCK_BLOCK_HEIGHT,
            "block_hash": MOCK_BLOCK_HASH,
        });
        let matcher = object(json!({
            "request_type": "view_account",
            "account_id": account.account_id,
        }));

        Ok(self.add_response_matching("query", matcher, result))
    }

    /// Register a `call_function` answer for `contract_id.method_name`
    ///
    /// `result` is JSON-encoded (compact) and returned as a list of bytes,
    /// the way a node returns view results.
    pub fn add_view_result<T: Serialize + ?Sized>(
        &self,
        contract_id: impl Into<String>,
        method_name: impl Into<String>,
        result: &T,
    ) -> Result<&Self> {
        let bytes = serde_json::to_vec(result)?;

        let reply = json!({
            "result": bytes,
            "logs": [],
            "block_height": MOCK_BLOCK_HEIGHT,
        });
        let matcher = object(json!({
            "request_type": "call_function",
            "account_id": contract_id.into(),
            "method_name": method_name.into(),
        }));

        Ok(self.add_response_matching("query", matcher, reply))
    }

    /// Number of registered entries
    pub fn response_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Record the call, then answer it from the first matching entry
    ///
    /// # Errors
    ///
    /// * `TestingError::MockRpc` if the matching entry is an error reply
    /// * `TestingError::NoMockRegistered` if nothing matches
    pub fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        let params = if params.is_null() {
            Value::Object(Map::new())
        } else {
            params
        };

        let reply = {
            let mut registry = self.inner.lock();
            registry.calls.push(CallRecord {
                method: method.to_string(),
                params: params.clone(),
            });
            registry
                .entries
                .iter()
                .find(|entry| entry.matches(method, &params))
                .map(|entry| entry.reply.clone())
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Mock dispatch method={} params={} matched={}",
                method,
                params,
                reply.is_some()
            );
        }

        match reply {
            Some(MockReply::Result(result)) => Ok(result),
            Some(MockReply::Error(message)) => Err(TestingError::MockRpc(message)),
            None => Err(TestingError::NoMockRegistered {
                method: method.to_string(),
                params,
            }),
        }
    }

    /// Swap this dispatcher in as `client`'s transport until the guard drops
    pub fn install<'a>(&self, client: &'a RpcClient) -> InterceptorGuard<'a> {
        client.intercept(Arc::new(self.clone()))
    }

    // ========================================================================
    // Call log
    // ========================================================================

    /// Snapshot of every recorded call, in order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.lock().calls.clone()
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Clear the call log; registered entries are kept
    pub fn reset(&self) {
        self.inner.lock().calls.clear();
    }

    /// Assert `method` was called, optionally with params containing `matcher`
    ///
    /// # Errors
    ///
    /// Returns `TestingError::Assertion` listing the recorded calls.
    pub fn assert_called(&self, method: &str, matcher: Option<&Map<String, Value>>) -> Result<()> {
        let calls = self.calls();
        let matching: Vec<&CallRecord> = calls.iter().filter(|c| c.method == method).collect();

        if matching.is_empty() {
            return Err(TestingError::Assertion(format!(
                "Expected RPC call to {:?}, but it was never called.\nAll calls: {:?}",
                method, calls
            )));
        }

        if let Some(matcher) = matcher {
            let found = matching.iter().any(|c| match &c.params {
                Value::Object(params) => is_subset(matcher, params),
                _ => false,
            });
            if !found {
                return Err(TestingError::Assertion(format!(
                    "RPC method {:?} was called, but no call matched {}.\nCalls to {:?}: {:?}",
                    method,
                    Value::Object(matcher.clone()),
                    method,
                    matching
                )));
            }
        }

        Ok(())
    }

    /// Assert `method` was never called
    pub fn assert_not_called(&self, method: &str) -> Result<()> {
        let matching: Vec<CallRecord> = self
            .calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect();

        if !matching.is_empty() {
            return Err(TestingError::Assertion(format!(
                "Expected no calls to {:?}, but found {}.\nCalls: {:?}",
                method,
                matching.len(),
                matching
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RpcTransport for MockDispatcher {
    /// Dispatch errors become JSON-RPC error responses, as a live node
    /// would report them
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse> {
        Ok(match self.dispatch(&request.method, request.params.clone()) {
            Ok(result) => RpcResponse::success(request, result),
            Err(e) => RpcResponse::failure(request, e.to_string()),
        })
    }
}

/// Unwrap a `json!` object literal
fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_first_registered_match_wins() {
        let mock = MockDispatcher::new();
        mock.add_response_matching("query", matcher(json!({"account_id": "a.near"})), json!(1))
            .add_response("query", json!(2))
            .add_response("query", json!(3));

        assert_eq!(mock.dispatch("query", json!({"account_id": "a.near"})).unwrap(), json!(1));
        assert_eq!(mock.dispatch("query", json!({"account_id": "b.near"})).unwrap(), json!(2));
        assert_eq!(mock.response_count(), 3);
    }

    #[test]
    fn test_matcher_requires_object_params() {
        let mock = MockDispatcher::new();
        mock.add_response_matching("block", matcher(json!({"finality": "final"})), json!("ok"));

        assert!(mock.dispatch("block", json!(["final"])).is_err());
        assert_eq!(
            mock.dispatch("block", json!({"finality": "final", "extra": 1})).unwrap(),
            json!("ok")
        );
    }

    #[test]
    fn test_empty_matcher_is_catch_all() {
        let mock = MockDispatcher::new();
        mock.register("status", MockReply::Result(json!("up")), Some(Map::new()));
        assert_eq!(mock.dispatch("status", json!([])).unwrap(), json!("up"));
    }

    #[test]
    fn test_error_reply() {
        let mock = MockDispatcher::new();
        mock.add_error("tx", "UNKNOWN_TRANSACTION", None);

        match mock.dispatch("tx", json!({})) {
            Err(TestingError::MockRpc(message)) => assert_eq!(message, "UNKNOWN_TRANSACTION"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_no_match_carries_method_and_params() {
        let mock = MockDispatcher::new();
        let err = mock.dispatch("gas_price", json!([null])).unwrap_err();

        match &err {
            TestingError::NoMockRegistered { method, params } => {
                assert_eq!(method, "gas_price");
                assert_eq!(params, &json!([null]));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(err.to_string().contains("gas_price"));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_null_params_recorded_as_empty_object() {
        let mock = MockDispatcher::new();
        mock.add_response("status", json!({}));
        mock.dispatch("status", Value::Null).unwrap();
        assert_eq!(mock.calls()[0].params, json!({}));
    }

    #[test]
    fn test_add_account_shape() {
        let mock = MockDispatcher::new();
        mock.add_account("alice.near", 50.0).unwrap();

        let result = mock
            .dispatch(
                "query",
                json!({"request_type": "view_account", "account_id": "alice.near", "finality": "final"}),
            )
            .unwrap();

        assert_eq!(
            result,
            json!({
                "amount": "50000000000000000000000000",
                "locked": "0",
                "code_hash": "11111111111111111111111111111111",
                "storage_usage": 182,
                "block_height": 100000000,
                "block_hash": "mock_block_hash",
            })
        );
        assert!(mock
            .dispatch("query", json!({"request_type": "view_account", "account_id": "bob.near"}))
            .is_err());
    }

    #[test]
    fn test_add_account_with_overrides() {
        let mock = MockDispatcher::new();
        mock.add_account_with(
            MockAccount::new("app.near", 1.5)
                .with_storage_usage(4096)
                .with_code_hash("E8jZ1giWcVrps8PcV75ATauu6gFRkcwjNtKp7NKmipZG")
                .with_locked("10"),
        )
        .unwrap();

        let result = mock
            .dispatch("query", json!({"request_type": "view_account", "account_id": "app.near"}))
            .unwrap();
        assert_eq!(result["amount"], "1500000000000000000000000");
        assert_eq!(result["storage_usage"], 4096);
        assert_eq!(result["locked"], "10");

        assert!(mock.add_account("bad.near", -1.0).is_err());
    }

    #[test]
    fn test_add_view_result_bytes() {
        let mock = MockDispatcher::new();
        mock.add_view_result("app.near", "get_greeting", &json!({"text": "hi"}))
            .unwrap();

        let result = mock
            .dispatch(
                "query",
                json!({
                    "request_type": "call_function",
                    "account_id": "app.near",
                    "method_name": "get_greeting",
                    "args_base64": "e30=",
                }),
            )
            .unwrap();

        let bytes: Vec<u8> = serde_json::from_value(result["result"].clone()).unwrap();
        assert_eq!(bytes, br#"{"text":"hi"}"#.to_vec());
        assert_eq!(result["logs"], json!([]));
        assert_eq!(result["block_height"], 100000000);
    }

    #[test]
    fn test_assert_called_and_not_called() {
        let mock = MockDispatcher::new();
        mock.add_response("query", json!({}));
        mock.dispatch("query", json!({"account_id": "alice.near"})).unwrap();

        mock.assert_called("query", None).unwrap();
        mock.assert_called("query", Some(&matcher(json!({"account_id": "alice.near"}))))
            .unwrap();

        let err = mock
            .assert_called("query", Some(&matcher(json!({"account_id": "bob.near"}))))
            .unwrap_err();
        assert!(err.to_string().contains("no call matched"));

        let err = mock.assert_called("status", None).unwrap_err();
        assert!(err.to_string().contains("never called"));

        mock.assert_not_called("status").unwrap();
        let err = mock.assert_not_called("query").unwrap_err();
        assert!(err.to_string().contains("found 1"));
    }

    #[test]
    fn test_reset_keeps_entries() {
        let mock = MockDispatcher::new();
        mock.add_response("status", json!({}));
        mock.dispatch("status", json!([])).unwrap();
        mock.dispatch("nope", json!([])).unwrap_err();
        assert_eq!(mock.call_count(), 2);

        mock.reset();
        assert_eq!(mock.call_count(), 0);
        assert_eq!(mock.response_count(), 1);
        assert!(mock.dispatch("status", json!([])).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockDispatcher::new();
        let clone = mock.clone();
        clone.add_response("status", json!({}));
        mock.dispatch("status", json!([])).unwrap();
        assert_eq!(clone.call_count(), 1);
    }

    #[tokio::test]
    async fn test_installed_mock_answers_client() {
        let mock = MockDispatcher::new();
        mock.add_account("alice.near", 50.0)
            .unwrap()
            .add_view_result("app.near", "get_greeting", "hello")
            .unwrap();

        let client = RpcClient::http("http://127.0.0.1:9");
        {
            let _guard = mock.install(&client);

            let account = client.view_account("alice.near").await.unwrap();
            assert_eq!(account.amount, "50000000000000000000000000");

            let greeting = client
                .view_function("app.near", "get_greeting", &json!({}))
                .await
                .unwrap();
            assert_eq!(greeting, json!("hello"));

            match client.status().await {
                Err(TestingError::Rpc(message)) => {
                    assert!(message.starts_with("No mock response registered"))
                }
                other => panic!("unexpected: {:?}", other),
            }
        }

        mock.assert_called("query", Some(&matcher(json!({"request_type": "view_account"}))))
            .unwrap();
        assert_eq!(mock.call_count(), 3);
    }
}
