//! Tier 1: Component-level testing
//!
//! In-process RPC mocking without a node.
//! Fast, deterministic, perfect for unit tests of code that talks to NEAR RPC.
//!
//! ## Key Features
//!
//! - Registration-ordered canned responses with subset matching
//! - Call log with `assert_called` / `assert_not_called`
//! - Scoped installation into an `RpcClient`
//!
//! ## Example
//!
//! ```rust,ignore
//! use near_testing_framework::prelude::*;
//!
//! #[tokio::test]
//! async fn test_reads_balance() {
//!     let mock = MockDispatcher::new();
//!     mock.add_account("alice.near", 50.0).unwrap();
//!
//!     let client = RpcClient::http("http://127.0.0.1:3030");
//!     let _guard = mock.install(&client);
//!
//!     // Code under test issues RPC calls through `client`...
//! }
//! ```

mod mock_rpc;

#[cfg(test)]
mod property_tests;

pub use mock_rpc::{
    CallRecord, MockAccount, MockDispatcher, MockReply, MockResponseEntry, DEFAULT_STORAGE_USAGE,
    EMPTY_CODE_HASH, MOCK_BLOCK_HASH, MOCK_BLOCK_HEIGHT,
};
