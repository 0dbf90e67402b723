//! Error types for the testing framework.

use std::io::Error as IoError;
use std::time::Duration;
use thiserror::Error;

/// Error type for sandbox, command, mock and assertion operations.
#[derive(Error, Debug)]
pub enum TestingError {
    /// The sandbox node could not be initialised, spawned or made ready.
    #[error("Sandbox startup failed: {0}")]
    SandboxStartup(String),

    /// Contract artifact missing, or the deploy step failed.
    #[error("Contract deployment failed: {0}")]
    ContractDeploy(String),

    /// A view call against a contract failed.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// A test expectation was violated.
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// The CLI refused to create a test account.
    #[error("Failed to create account {account_id}: {output}")]
    AccountCreation {
        /// Account that was being created
        account_id: String,
        /// Captured stderr (or stdout when stderr was empty)
        output: String,
    },

    /// No registered mock entry matched a dispatched call.
    #[error("No mock response registered for method={method:?} params={params}")]
    NoMockRegistered {
        /// Requested RPC method
        method: String,
        /// Requested params, verbatim
        params: serde_json::Value,
    },

    /// A registered mock entry answered with an error.
    #[error("Mock RPC error: {0}")]
    MockRpc(String),

    /// The RPC endpoint answered with a JSON-RPC error object.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// An external command did not finish in time.
    #[error("Command `{program}` timed out after {timeout:?}")]
    CommandTimeout {
        /// Program that was executed
        program: String,
        /// Timeout that expired
        timeout: Duration,
    },

    /// An external command could not be spawned at all.
    #[error("Failed to spawn `{program}`: {source}")]
    CommandSpawn {
        /// Program that was executed
        program: String,
        /// Underlying OS error
        #[source]
        source: IoError,
    },

    /// A NEAR amount could not be converted to yoctoNEAR.
    #[error("Invalid NEAR amount: {0}")]
    InvalidAmount(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Result type alias for testing framework operations.
pub type Result<T, E = TestingError> = std::result::Result<T, E>;
