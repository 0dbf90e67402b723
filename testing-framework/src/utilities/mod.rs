// File: testing-framework/src/utilities/mod.rs
//
// Testing Utilities
//
// This module provides the building blocks the sandbox and the contract
// helpers share: command execution, home directory management, yoctoNEAR
// conversion, and account/contract workflows driven through the CLI.

/// External command execution with timeouts
pub mod command;

/// Temporary home directories for sandbox nodes
pub mod storage;

/// NEAR / yoctoNEAR conversion
pub mod amounts;

/// Funded test accounts
pub mod accounts;

/// Contract deployment, change calls and view calls
pub mod contract_helpers;

// Re-export commonly used utilities
pub use accounts::TestAccount;
pub use amounts::{near_to_yocto, parse_near_amount, ONE_NEAR};
pub use command::{CommandOutput, CommandRunner};
pub use contract_helpers::{
    call_contract, view_contract, CallOptions, ContractDeployer, ContractHandle, DeployOptions,
};
pub use storage::SandboxHome;
