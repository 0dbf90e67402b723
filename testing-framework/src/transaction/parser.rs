// File: testing-framework/src/transaction/parser.rs
//
// CLI Output Parser
//
// near-cli prints a mix of human readable text and JSON. This module turns
// that text into a `TransactionResult` without ever failing: unexpected
// output degrades to empty fields.

use super::{TransactionResult, TransactionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Phrases announcing a transaction hash on the same line
const HASH_MARKERS: [&str; 2] = ["Transaction Id", "transaction_hash"];

/// Line prefixes collected verbatim into `logs`
const LOG_PREFIXES: [&str; 2] = ["Log [", "Receipt:"];

/// Keywords that make the text heuristic report a failure
const FAILURE_KEYWORDS: [&str; 4] = ["error", "failure", "failed", "panic"];

/// Keyword that vetoes the failure keywords
const SUCCESS_KEYWORD: &str = "success";

/// Length of a base58 NEAR transaction hash as printed by the CLI
const TX_HASH_LEN: usize = 44;

/// How plain text (outside JSON blocks) influences the parsed status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureHeuristic {
    /// Any of `error`/`failure`/`failed`/`panic` without `success` anywhere
    /// in the output marks the transaction as failed.
    ///
    /// Known limitation: a successful call whose contract logs mention
    /// "error" is reported as a failure unless "success" also appears.
    #[default]
    Keywords,
    /// Only structured JSON status (and the caller's exit code) decide.
    Disabled,
}

/// Parser for near-cli output
///
/// # Example
///
/// ```rust
/// use near_testing_framework::transaction::{TransactionOutputParser, TransactionStatus};
///
/// let stdout = "Transaction Id 9FtHUFBQsZ2MG77K3x3MJ9wjX3UT8zE1TczCrhZEcG8U\n\
///               Log [app.test.near]: greeting set";
/// let result = TransactionOutputParser::new().parse(stdout, "");
///
/// assert_eq!(result.hash, "9FtHUFBQsZ2MG77K3x3MJ9wjX3UT8zE1TczCrhZEcG8U");
/// assert_eq!(result.status, TransactionStatus::Success);
/// assert_eq!(result.logs, vec!["Log [app.test.near]: greeting set"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionOutputParser {
    heuristic: FailureHeuristic,
}

impl TransactionOutputParser {
    /// Parser with the keyword heuristic enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser that ignores plain-text keywords
    pub fn strict() -> Self {
        Self {
            heuristic: FailureHeuristic::Disabled,
        }
    }

    /// Parser using the given heuristic
    pub fn with_heuristic(heuristic: FailureHeuristic) -> Self {
        Self { heuristic }
    }

    /// Heuristic in use
    pub fn heuristic(&self) -> FailureHeuristic {
        self.heuristic
    }

    /// Parse combined stdout/stderr text into a `TransactionResult`
    ///
    /// Identical input always yields an identical result.
    pub fn parse(&self, stdout: &str, stderr: &str) -> TransactionResult {
        let combined = format!("{}\n{}", stdout, stderr);

        let mut hash: Option<String> = None;
        let mut json_hash: Option<String> = None;
        let mut status = TransactionStatus::Success;
        let mut logs = Vec::new();
        let mut receipts = Vec::new();
        let mut raw = Value::Object(Default::default());

        for line in combined.lines() {
            let stripped = line.trim();

            if hash.is_none() {
                hash = find_hash(stripped);
            }

            if LOG_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
                logs.push(stripped.to_string());
            }

            if stripped.starts_with('{') {
                if let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(stripped) {
                    let outcome = inspect_json_block(&parsed);
                    if outcome.failed {
                        status = TransactionStatus::Failure;
                    } else if outcome.pending && status == TransactionStatus::Success {
                        status = TransactionStatus::Pending;
                    }
                    if json_hash.is_none() {
                        json_hash = outcome.hash;
                    }
                    logs.extend(outcome.logs);
                    receipts.extend(outcome.receipts);
                    raw = parsed;
                }
            }
        }

        if self.heuristic == FailureHeuristic::Keywords && keywords_indicate_failure(&combined) {
            status = TransactionStatus::Failure;
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Parsed CLI output: status={}, {} log line(s), {} receipt(s)",
                status,
                logs.len(),
                receipts.len()
            );
        }

        TransactionResult {
            hash: hash.or(json_hash).unwrap_or_default(),
            status,
            logs,
            receipts,
            raw,
        }
    }
}

/// Parse CLI output with the default (keyword heuristic) parser
pub fn parse_cli_output(stdout: &str, stderr: &str) -> TransactionResult {
    TransactionOutputParser::new().parse(stdout, stderr)
}

/// What a single JSON block contributed
#[derive(Default)]
struct JsonOutcome {
    failed: bool,
    pending: bool,
    hash: Option<String>,
    logs: Vec<String>,
    receipts: Vec<Value>,
}

fn inspect_json_block(parsed: &Value) -> JsonOutcome {
    let mut outcome = JsonOutcome::default();

    match parsed.get("status") {
        Some(status) if is_failure_status(status) => outcome.failed = true,
        Some(Value::String(s)) if s == "NotStarted" || s == "Started" => outcome.pending = true,
        _ => {}
    }

    if let Some(tx_outcome) = parsed.get("transaction_outcome").and_then(|o| o.get("outcome")) {
        collect_outcome(tx_outcome, &mut outcome);
    }

    if let Some(Value::Array(receipt_outcomes)) = parsed.get("receipts_outcome") {
        for receipt in receipt_outcomes {
            if let Some(inner) = receipt.get("outcome") {
                collect_outcome(inner, &mut outcome);
            }
            outcome.receipts.push(receipt.clone());
        }
    }

    outcome.hash = parsed
        .get("transaction")
        .and_then(|tx| tx.get("hash"))
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    outcome
}

fn collect_outcome(inner: &Value, outcome: &mut JsonOutcome) {
    if inner.get("status").is_some_and(is_failure_status) {
        outcome.failed = true;
    }
    if let Some(Value::Array(lines)) = inner.get("logs") {
        outcome
            .logs
            .extend(lines.iter().filter_map(Value::as_str).map(str::to_string));
    }
}

fn is_failure_status(status: &Value) -> bool {
    status
        .as_object()
        .is_some_and(|map| map.contains_key("Failure"))
}

/// Hash following a marker on the same line, or a line that is only a hash
fn find_hash(line: &str) -> Option<String> {
    let after_marker = HASH_MARKERS
        .iter()
        .filter_map(|m| line.split_once(m).map(|(_, tail)| tail))
        .find_map(|tail| tail.split_whitespace().find_map(as_tx_hash));
    after_marker
        .or_else(|| as_tx_hash(line))
        .map(str::to_string)
}

fn as_tx_hash(token: &str) -> Option<&str> {
    let token = token.trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | ':' | ';' | '.'));
    (token.len() == TX_HASH_LEN && token.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(token)
}

fn keywords_indicate_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    FAILURE_KEYWORDS.iter().any(|k| lower.contains(k)) && !lower.contains(SUCCESS_KEYWORD)
}
