// File: testing-framework/src/transaction/mod.rs
//
// Transaction Outcome Model
//
// This module defines the structured outcome of a NEAR transaction as seen by
// tests, regardless of whether it came from a live sandbox (parsed CLI output)
// or was built by hand in a unit test.

/// Best-effort parser turning CLI text into a `TransactionResult`
pub mod parser;

pub use parser::{parse_cli_output, FailureHeuristic, TransactionOutputParser};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix marking a NEP-297 structured event inside a log line.
pub const EVENT_JSON_PREFIX: &str = "EVENT_JSON:";

/// Outcome status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Transaction executed successfully
    Success,
    /// Transaction (or one of its receipts) failed
    Failure,
    /// Transaction has not finished executing yet
    Pending,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Failure => write!(f, "failure"),
            TransactionStatus::Pending => write!(f, "pending"),
        }
    }
}

/// Parsed result of a NEAR transaction
///
/// Instances are produced once per parsed command output. The only field
/// callers are expected to change afterwards is `status`, when the exit code
/// of the command that produced the output says otherwise.
///
/// # Example
///
/// ```rust
/// use near_testing_framework::transaction::{TransactionResult, TransactionStatus};
///
/// let result = TransactionResult::new("", TransactionStatus::Success)
///     .with_logs(vec![r#"EVENT_JSON:{"standard":"nep171","event":"nft_mint"}"#.to_string()]);
///
/// assert!(result.succeeded());
/// assert_eq!(result.events().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Transaction hash (empty when none could be found)
    pub hash: String,
    /// Outcome status
    pub status: TransactionStatus,
    /// Log lines in emission order
    pub logs: Vec<String>,
    /// Receipt outcomes, opaque
    pub receipts: Vec<Value>,
    /// Last structured JSON block seen in the output, opaque
    pub raw: Value,
}

impl TransactionResult {
    /// Create an empty result with the given hash and status
    pub fn new(hash: impl Into<String>, status: TransactionStatus) -> Self {
        Self {
            hash: hash.into(),
            status,
            logs: Vec::new(),
            receipts: Vec::new(),
            raw: Value::Object(Default::default()),
        }
    }

    /// Replace the log lines
    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Replace the raw JSON payload
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Force `Failure` unless the producing command exited with code 0
    ///
    /// The exit code outranks anything read from the output text.
    pub fn apply_exit_code(&mut self, exit_code: Option<i32>) {
        if exit_code != Some(0) {
            self.status = TransactionStatus::Failure;
        }
    }

    /// True if the status is `Success`
    pub fn succeeded(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    /// True if the status is `Failure`
    pub fn failed(&self) -> bool {
        self.status == TransactionStatus::Failure
    }

    /// NEP-297 events decoded from the logs
    ///
    /// A log line counts as an event when it starts with `EVENT_JSON:`, either
    /// directly or after the CLI's `Log [<account>]: ` prefix. Lines whose
    /// payload is not valid JSON are skipped. The result is recomputed on
    /// every call and never cached on `self`.
    pub fn events(&self) -> Vec<Value> {
        self.logs
            .iter()
            .filter_map(|line| event_payload(line))
            .filter_map(|payload| serde_json::from_str(payload).ok())
            .collect()
    }
}

/// Return the JSON payload of an event log line, if it carries the marker.
fn event_payload(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if let Some(payload) = line.strip_prefix(EVENT_JSON_PREFIX) {
        return Some(payload);
    }

    // near-cli prints contract logs as `Log [contract.near]: <message>`
    let rest = line.strip_prefix("Log [")?;
    let (_, message) = rest.split_once("]:")?;
    message.trim_start().strip_prefix(EVENT_JSON_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with_logs(logs: &[&str]) -> TransactionResult {
        TransactionResult::new("hash", TransactionStatus::Success)
            .with_logs(logs.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn test_exit_code_overrides_status() {
        let mut result = TransactionResult::new("hash", TransactionStatus::Success);
        result.apply_exit_code(Some(0));
        assert!(result.succeeded());

        result.apply_exit_code(Some(1));
        assert!(result.failed());

        let mut pending = TransactionResult::new("hash", TransactionStatus::Pending);
        pending.apply_exit_code(None);
        assert!(pending.failed());
    }

    #[test]
    fn test_events_empty_without_marker() {
        let result = result_with_logs(&["Log [app.test.near]: hello", "Receipt: abc"]);
        assert!(result.events().is_empty());
    }

    #[test]
    fn test_events_skip_malformed_lines() {
        let result = result_with_logs(&[
            r#"EVENT_JSON:{"standard":"nep141","event":"ft_transfer","data":[]}"#,
            "EVENT_JSON:{not json",
            r#"Log [token.test.near]: EVENT_JSON:{"standard":"nep141","event":"ft_mint"}"#,
            "Log [token.test.near]: EVENT_JSON:",
            "plain line",
        ]);

        let events = result.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], json!("ft_transfer"));
        assert_eq!(events[1]["event"], json!("ft_mint"));
    }

    #[test]
    fn test_events_do_not_mutate_result() {
        let result = result_with_logs(&[r#"EVENT_JSON:{"event":"a"}"#]);
        let before = result.clone();

        let first = result.events();
        let second = result.events();

        assert_eq!(first, second);
        assert_eq!(result, before);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TransactionStatus::Success.to_string(), "success");
        assert_eq!(TransactionStatus::Failure.to_string(), "failure");
        assert_eq!(TransactionStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_succeeded_and_failed() {
        let ok = TransactionResult::new("h", TransactionStatus::Success);
        let bad = TransactionResult::new("h", TransactionStatus::Failure);
        let pending = TransactionResult::new("h", TransactionStatus::Pending);

        assert!(ok.succeeded() && !ok.failed());
        assert!(!bad.succeeded() && bad.failed());
        assert!(!pending.succeeded() && !pending.failed());
    }
}
