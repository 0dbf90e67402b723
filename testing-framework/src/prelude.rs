//! Convenient re-exports for test files
//!
//! ```rust,ignore
//! use near_testing_framework::prelude::*;
//! ```

pub use crate::assertions::{
    assert_event_emitted, assert_log_contains, assert_transaction_failure,
    assert_transaction_success, is_subset,
};
pub use crate::error::{Result, TestingError};
pub use crate::orchestrator::{Clock, PausedClock, SystemClock};
pub use crate::tier1_component::{CallRecord, MockAccount, MockDispatcher, MockReply};
pub use crate::tier2_integration::{
    run_in_sandbox, AccountView, HttpTransport, ProcessSandbox, RpcClient, RpcRequest,
    RpcResponse, RpcTransport, SandboxBuilder, SandboxConfig, SandboxState,
};
pub use crate::transaction::{
    parse_cli_output, FailureHeuristic, TransactionOutputParser, TransactionResult,
    TransactionStatus,
};
pub use crate::utilities::{
    call_contract, near_to_yocto, view_contract, CallOptions, CommandOutput, ContractDeployer,
    ContractHandle, DeployOptions, TestAccount, ONE_NEAR,
};

pub use serde_json::json;
pub use std::sync::Arc;
pub use tokio::time::Duration;
