//! SandboxBuilder - Fluent API for configuring ProcessSandbox instances

use super::sandbox::ProcessSandbox;
use crate::error::Result;
use crate::orchestrator::{Clock, SystemClock};
use crate::transaction::FailureHeuristic;
use crate::utilities::command::DEFAULT_COMMAND_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default RPC port of a sandbox node
pub const DEFAULT_RPC_PORT: u16 = 3030;

/// Chain id passed to `init` and network id passed to the CLI
pub const LOCALNET: &str = "localnet";

/// Account that funds accounts created through the CLI
pub const DEFAULT_MASTER_ACCOUNT: &str = "test.near";

/// Node binaries looked up on `PATH`, in order, when none is configured
pub const NODE_BINARY_CANDIDATES: [&str; 2] = ["neard", "near-sandbox"];

/// Sandbox configuration
///
/// Every knob of a sandbox lives here; nothing is read from process-wide
/// state. Deserializes with defaults for missing fields, so a test suite can
/// keep a partial config in a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Host used to build the RPC URL
    pub rpc_host: String,
    /// RPC port; `0` picks a free local port at start
    pub rpc_port: u16,
    /// Node binary; `None` searches `PATH` for `neard` then `near-sandbox`
    pub node_binary: Option<PathBuf>,
    /// CLI binary (`near`)
    pub cli_binary: PathBuf,
    /// Chain id passed to `init`
    pub chain_id: String,
    /// `--networkId` passed to CLI commands
    pub network_id: String,
    /// Account funding new test accounts
    pub master_account: String,
    /// Caller-provided home directory, never deleted
    pub home_dir: Option<PathBuf>,
    /// Upper bound on waiting for the node to answer `status`
    pub startup_timeout: Duration,
    /// Delay between readiness probes
    pub poll_interval: Duration,
    /// Timeout of a single readiness probe
    pub probe_timeout: Duration,
    /// Timeout of the `init` command
    pub init_timeout: Duration,
    /// Default timeout of CLI commands
    pub command_timeout: Duration,
    /// Wait after SIGTERM before killing the node
    pub shutdown_grace: Duration,
    /// Wait after the forced kill
    pub kill_grace: Duration,
    /// How CLI output without structured status is classified
    pub failure_heuristic: FailureHeuristic,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            node_binary: None,
            cli_binary: PathBuf::from("near"),
            chain_id: LOCALNET.to_string(),
            network_id: LOCALNET.to_string(),
            master_account: DEFAULT_MASTER_ACCOUNT.to_string(),
            home_dir: None,
            startup_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            probe_timeout: Duration::from_secs(2),
            init_timeout: Duration::from_secs(30),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            shutdown_grace: Duration::from_secs(10),
            kill_grace: Duration::from_secs(5),
            failure_heuristic: FailureHeuristic::default(),
        }
    }
}

impl SandboxConfig {
    /// Load a config from a JSON file, missing fields taking defaults
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Builder for ProcessSandbox instances with fluent API
///
/// # Example
///
/// ```rust,ignore
/// use near_testing_framework::tier2_integration::SandboxBuilder;
///
/// let mut sandbox = SandboxBuilder::new()
///     .with_free_rpc_port()
///     .with_startup_timeout(Duration::from_secs(60))
///     .start()
///     .await?;
///
/// let alice = TestAccount::create(&sandbox, "alice.test.near", 10.0).await?;
/// sandbox.stop().await;
/// ```
pub struct SandboxBuilder {
    config: SandboxConfig,

    /// Clock driving the readiness poll
    clock: Option<Arc<dyn Clock>>,
}

impl SandboxBuilder {
    /// Create new builder with defaults
    ///
    /// Default configuration:
    /// - RPC on port 3030, `neard`/`near-sandbox` from `PATH`, `near` CLI
    /// - Temporary home directory
    /// - 30s startup timeout polled every 500ms
    /// - SystemClock (real time)
    pub fn new() -> Self {
        Self {
            config: SandboxConfig::default(),
            clock: None,
        }
    }

    /// Start from an existing config
    pub fn from_config(config: SandboxConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// Current config
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Set the RPC port
    pub fn with_rpc_port(mut self, port: u16) -> Self {
        self.config.rpc_port = port;
        self
    }

    /// Pick a free local RPC port when the sandbox starts
    ///
    /// Lets several sandboxes run side by side in one test binary.
    pub fn with_free_rpc_port(mut self) -> Self {
        self.config.rpc_port = 0;
        self
    }

    /// Set the host used in the RPC URL
    pub fn with_rpc_host(mut self, host: impl Into<String>) -> Self {
        self.config.rpc_host = host.into();
        self
    }

    /// Use a specific node binary instead of searching `PATH`
    pub fn with_node_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.node_binary = Some(path.into());
        self
    }

    /// Use a specific CLI binary
    pub fn with_cli_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cli_binary = path.into();
        self
    }

    /// Set the chain id passed to `init`
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.config.chain_id = chain_id.into();
        self
    }

    /// Set the account funding new test accounts
    pub fn with_master_account(mut self, account_id: impl Into<String>) -> Self {
        self.config.master_account = account_id.into();
        self
    }

    /// Use a caller-provided home directory
    ///
    /// The directory is left in place when the sandbox stops.
    pub fn with_home_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.home_dir = Some(path.into());
        self
    }

    /// Set the readiness timeout
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    /// Set the delay between readiness probes
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the timeout of the `init` command
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.config.init_timeout = timeout;
        self
    }

    /// Set the default CLI command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Set the SIGTERM and kill grace periods used by `stop()`
    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration, kill_grace: Duration) -> Self {
        self.config.shutdown_grace = shutdown_grace;
        self.config.kill_grace = kill_grace;
        self
    }

    /// Select how CLI output is classified when it has no structured status
    pub fn with_failure_heuristic(mut self, heuristic: FailureHeuristic) -> Self {
        self.config.failure_heuristic = heuristic;
        self
    }

    /// Set clock implementation
    ///
    /// If not set, uses `SystemClock` by default.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the sandbox without starting it
    pub fn build(self) -> ProcessSandbox {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        ProcessSandbox::new(self.config, clock)
    }

    /// Build and start the sandbox
    ///
    /// # Errors
    ///
    /// Returns `TestingError::SandboxStartup` if the node cannot be
    /// initialised or never becomes ready. The node is terminated and a
    /// temporary home removed before the error is returned.
    pub async fn start(self) -> Result<ProcessSandbox> {
        let mut sandbox = self.build();
        sandbox.start().await?;
        Ok(sandbox)
    }
}

impl Default for SandboxBuilder {
    fn default() -> Self {
        Self::new()
    }
}
