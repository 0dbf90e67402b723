//! Property-based tests for the mock dispatcher
//!
//! # Key Properties Tested
//!
//! 1. **Call Recording**: every dispatch is recorded exactly once, whatever its outcome
//! 2. **First Match Wins**: earlier entries shadow later ones
//! 3. **Subset Matching**: a matcher drawn from the params always matches them
//! 4. **Reset**: clears the call log, never the registry
//! 5. **Exact Amounts**: whole NEAR balances become exact yoctoNEAR strings
//!
//! Failed cases can be reproduced by setting the `PROPTEST_RNG_SEED`
//! environment variable.

use super::{MockDispatcher, MockReply};
use crate::error::TestingError;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// RPC method names
fn arb_method() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("query".to_string()),
        Just("status".to_string()),
        Just("block".to_string()),
        Just("tx".to_string()),
        "[a-z_]{1,12}",
    ]
}

/// Flat object params with string and integer values
fn arb_params() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        "[a-z_]{1,10}",
        prop_oneof![
            "[a-z0-9.]{0,16}".prop_map(Value::String),
            any::<u32>().prop_map(|n| json!(n)),
        ],
        0..6,
    )
    .prop_map(|map| map.into_iter().collect())
}

/// Params plus a matcher made of some of their entries
fn arb_params_with_matcher() -> impl Strategy<Value = (Map<String, Value>, Map<String, Value>)> {
    arb_params().prop_flat_map(|params| {
        let len = params.len();
        (Just(params), prop::collection::vec(any::<bool>(), len))
    })
    .prop_map(|(params, keep)| {
        let matcher = params
            .iter()
            .zip(keep)
            .filter(|(_, keep)| *keep)
            .map(|((k, v), _)| (k.clone(), v.clone()))
            .collect();
        (params, matcher)
    })
}

proptest! {
    /// Property: one call record per dispatch, success or not
    #[test]
    fn prop_every_dispatch_recorded(
        registered in prop::collection::vec(arb_method(), 0..4),
        dispatched in prop::collection::vec((arb_method(), arb_params()), 0..12),
    ) {
        let mock = MockDispatcher::new();
        for method in &registered {
            mock.add_response(method.clone(), json!("ok"));
        }

        for (i, (method, params)) in dispatched.iter().enumerate() {
            let outcome = mock.dispatch(method, Value::Object(params.clone()));
            prop_assert_eq!(outcome.is_ok(), registered.contains(method));
            prop_assert_eq!(mock.call_count(), i + 1);
        }

        let calls = mock.calls();
        for (call, (method, params)) in calls.iter().zip(&dispatched) {
            prop_assert_eq!(&call.method, method);
            prop_assert_eq!(&call.params, &Value::Object(params.clone()));
        }
    }

    /// Property: among entries for the same method, the first one answers
    #[test]
    fn prop_first_match_wins(
        method in arb_method(),
        results in prop::collection::vec(any::<i64>(), 1..6),
        params in arb_params(),
    ) {
        let mock = MockDispatcher::new();
        for result in &results {
            mock.add_response(method.clone(), json!(result));
        }

        let answer = mock.dispatch(&method, Value::Object(params)).unwrap();
        prop_assert_eq!(answer, json!(results[0]));
    }

    /// Property: a matcher built from a subset of the params matches them,
    /// and stops matching once one of its values differs
    #[test]
    fn prop_subset_matcher_matches(
        (params, matcher) in arb_params_with_matcher(),
    ) {
        let mock = MockDispatcher::new();
        mock.register("query", MockReply::Result(json!("hit")), Some(matcher.clone()));

        prop_assert_eq!(
            mock.dispatch("query", Value::Object(params.clone())).unwrap(),
            json!("hit")
        );

        if let Some((key, _)) = matcher.iter().next() {
            let mut altered = params.clone();
            altered.insert(key.clone(), json!(["never", "equal"]));
            let outcome = mock.dispatch("query", Value::Object(altered));
            let no_match = matches!(outcome, Err(TestingError::NoMockRegistered { .. }));
            prop_assert!(no_match);
        }
    }

    /// Property: reset empties the call log and keeps every entry
    #[test]
    fn prop_reset_keeps_registry(
        methods in prop::collection::vec(arb_method(), 1..6),
    ) {
        let mock = MockDispatcher::new();
        for method in &methods {
            mock.add_response(method.clone(), json!({}));
            let _ = mock.dispatch(method, json!({}));
        }

        mock.reset();
        prop_assert_eq!(mock.call_count(), 0);
        prop_assert_eq!(mock.response_count(), methods.len());
        for method in &methods {
            let outcome = mock.dispatch(method, json!({}));
            prop_assert!(outcome.is_ok());
        }
    }

    /// Property: whole NEAR balances are converted exactly
    #[test]
    fn prop_whole_balance_exact(near in 0u32..1_000_000) {
        let mock = MockDispatcher::new();
        mock.add_account("acct.near", f64::from(near)).unwrap();

        let result = mock
            .dispatch("query", json!({"request_type": "view_account", "account_id": "acct.near"}))
            .unwrap();
        let expected = if near == 0 {
            "0".to_string()
        } else {
            format!("{}{}", near, "0".repeat(24))
        };
        prop_assert_eq!(result["amount"].as_str().unwrap(), expected.as_str());
    }
}
