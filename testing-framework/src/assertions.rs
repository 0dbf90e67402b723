//! Assertion helpers over transaction results
//!
//! These helpers make contract tests more readable and produce error messages
//! that carry everything needed to debug a failed expectation: the hash, the
//! status, every log line and the raw JSON payload.

use crate::error::{Result, TestingError};
use crate::transaction::TransactionResult;
use serde_json::{Map, Value};

/// True if every key of `subset` is present in `superset` with an equal value
///
/// Extra keys in `superset` are ignored.
pub fn is_subset(subset: &Map<String, Value>, superset: &Map<String, Value>) -> bool {
    subset
        .iter()
        .all(|(key, value)| superset.get(key) == Some(value))
}

/// Same as [`is_subset`], for a `superset` of any JSON shape
///
/// Non-object values never contain a non-empty subset.
pub fn is_subset_of_value(subset: &Map<String, Value>, superset: &Value) -> bool {
    match superset {
        Value::Object(map) => is_subset(subset, map),
        _ => subset.is_empty(),
    }
}

/// Assert that a transaction completed successfully
///
/// # Errors
///
/// Returns `TestingError::Assertion` if the status is anything but success.
///
/// # Example
///
/// ```rust,ignore
/// let result = alice.call("app.test.near", "set_greeting", json!({"greeting": "hi"})).await?;
/// assert_transaction_success(&result)?;
/// ```
pub fn assert_transaction_success(result: &TransactionResult) -> Result<()> {
    if !result.succeeded() {
        return Err(TestingError::Assertion(format!(
            "Expected transaction {} to succeed, but status was '{}'.\nLogs: {:?}\nRaw: {}",
            result.hash,
            result.status,
            result.logs,
            pretty(&result.raw)
        )));
    }
    Ok(())
}

/// Assert that a transaction failed
///
/// Useful for testing that invalid operations are rejected.
///
/// # Errors
///
/// Returns `TestingError::Assertion` if the status is not failure.
pub fn assert_transaction_failure(result: &TransactionResult) -> Result<()> {
    if !result.failed() {
        return Err(TestingError::Assertion(format!(
            "Expected transaction {} to fail, but status was '{}'.\nLogs: {:?}\nRaw: {}",
            result.hash,
            result.status,
            result.logs,
            pretty(&result.raw)
        )));
    }
    Ok(())
}

/// Assert that a NEP-297 event was emitted
///
/// # Arguments
///
/// * `result` - The transaction result to inspect
/// * `event` - Expected `event` field (e.g. `"nft_mint"`)
/// * `standard` - Expected `standard` field, if any (e.g. `"nep171"`)
/// * `data` - Key/value pairs that at least one entry of the event's `data`
///   array must contain
///
/// # Returns
///
/// The first matching event.
///
/// # Example
///
/// ```rust,ignore
/// let data = json!({"owner_id": "alice.test.near"});
/// let event = assert_event_emitted(&result, "nft_mint", Some("nep171"), data.as_object())?;
/// assert_eq!(event["version"], "1.0.0");
/// ```
pub fn assert_event_emitted(
    result: &TransactionResult,
    event: &str,
    standard: Option<&str>,
    data: Option<&Map<String, Value>>,
) -> Result<Value> {
    let events = result.events();

    let found = events.iter().find(|evt| {
        if evt.get("event").and_then(Value::as_str) != Some(event) {
            return false;
        }
        if let Some(standard) = standard {
            if evt.get("standard").and_then(Value::as_str) != Some(standard) {
                return false;
            }
        }
        match data {
            Some(expected) => event_data_matches(evt, expected),
            None => true,
        }
    });

    match found {
        Some(evt) => Ok(evt.clone()),
        None => Err(TestingError::Assertion(format!(
            "Event '{}'{} not found in transaction {}.\nEmitted events: {}\nRaw logs: {:?}",
            event,
            standard
                .map(|s| format!(" (standard '{}')", s))
                .unwrap_or_default(),
            result.hash,
            Value::Array(events.clone()),
            result.logs
        ))),
    }
}

/// Assert that at least one log line contains `substring`
///
/// # Returns
///
/// The first matching log line.
pub fn assert_log_contains<'a>(result: &'a TransactionResult, substring: &str) -> Result<&'a str> {
    result
        .logs
        .iter()
        .find(|line| line.contains(substring))
        .map(String::as_str)
        .ok_or_else(|| {
            TestingError::Assertion(format!(
                "No log line contains '{}'.\nLogs: {:?}",
                substring, result.logs
            ))
        })
}

fn event_data_matches(evt: &Value, expected: &Map<String, Value>) -> bool {
    match evt.get("data") {
        Some(Value::Array(entries)) => entries.iter().any(|e| is_subset_of_value(expected, e)),
        Some(other) => is_subset_of_value(expected, other),
        // Events without data behave like `[{}]`
        None => expected.is_empty(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
