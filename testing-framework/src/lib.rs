//! # NEAR Testing Framework
//!
//! Sandbox lifecycle, mock RPC and assertion toolkit for NEAR contract tests.
//!
//! ## Architecture Overview
//!
//! Two tiers sharing one result model:
//! - **Tier 1**: Component tests (MockDispatcher installed into an RpcClient, no node)
//! - **Tier 2**: Integration tests (ProcessSandbox running `neard` + `near` CLI)
//!
//! Both tiers produce `TransactionResult`s or JSON values that the
//! `assertions` module checks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use near_testing_framework::prelude::*;
//!
//! #[tokio::test]
//! async fn test_counter() -> anyhow::Result<()> {
//!     run_in_sandbox(SandboxBuilder::new().with_free_rpc_port(), |sandbox| {
//!         Box::pin(async move {
//!             let alice = TestAccount::create(sandbox, "alice.test.near", 10).await?;
//!             ContractDeployer::new(sandbox)
//!                 .deploy("res/counter.wasm", "counter.test.near", DeployOptions::default())
//!                 .await?;
//!
//!             let result = alice
//!                 .call("counter.test.near", "increment", &json!({}), &CallOptions::default())
//!                 .await?;
//!             assert_transaction_success(&result)?;
//!             Ok(())
//!         })
//!     })
//!     .await
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **No globals**: binaries, ports and timeouts live in `SandboxConfig`
//! 2. **Scoped mocking**: the mock transport is installed for a guard's lifetime
//! 3. **Exit code wins**: a non-zero CLI exit always means failure
//! 4. **Bounded waits**: every spawn, poll and shutdown has a timeout

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Clock abstraction driving the sandbox readiness poll
pub mod orchestrator;

// Tier 1: Component-level testing (in-process mock RPC)
pub mod tier1_component;

/// Tier 2: Integration testing (sandbox node + RPC)
pub mod tier2_integration;

/// Shared utilities: commands, storage, amounts, accounts, contracts
pub mod utilities;

/// Transaction outcome model and CLI output parser
pub mod transaction;

/// Assertion helpers over transaction results
pub mod assertions;

/// Error types
pub mod error;

// Convenient re-exports for common usage
pub mod prelude;

// Re-export commonly used types at crate root
pub use error::{Result, TestingError};
pub use tier1_component::MockDispatcher;
pub use tier2_integration::{ProcessSandbox, RpcClient, SandboxBuilder};
pub use transaction::{TransactionResult, TransactionStatus};

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
