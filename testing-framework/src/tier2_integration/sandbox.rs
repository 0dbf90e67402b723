//! ProcessSandbox - Local NEAR node for Tier 2 integration testing
//!
//! Boots an isolated `neard` / `near-sandbox` process in its own home
//! directory, waits until its RPC endpoint answers, and runs the `near` CLI
//! against it. Shutdown is graceful first (SIGTERM), forced second.

use super::builder::{SandboxBuilder, SandboxConfig, NODE_BINARY_CANDIDATES};
use super::{HttpTransport, RpcClient, RpcRequest};
use crate::error::{Result, TestingError};
use crate::orchestrator::{Clock, Deadline};
use crate::transaction::TransactionOutputParser;
use crate::utilities::command::{CommandOutput, CommandRunner};
use crate::utilities::storage::SandboxHome;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Request id of readiness probes
const HEALTH_REQUEST_ID: &str = "health";

/// Request id of raw RPC calls
const RPC_REQUEST_ID: &str = "near-testing";

/// Lifecycle state of a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxState {
    /// Built, never started
    NotStarted,
    /// `start()` in progress
    Initializing,
    /// Node answered `status`
    Running,
    /// Stopped after running
    Stopped,
    /// Startup failed; the reason is kept for diagnostics
    Failed(String),
}

/// Local node process managed for the duration of a test
///
/// The sandbox exclusively owns its child process and home directory.
/// `start()` and `stop()` take `&mut self`, so lifecycle calls cannot race.
///
/// # Example
///
/// ```rust,ignore
/// let mut sandbox = SandboxBuilder::new().build();
/// sandbox.start().await?;
///
/// let output = sandbox.run_near_cli(["state", "test.near"]).await?;
/// assert!(output.success());
///
/// sandbox.stop().await;
/// ```
pub struct ProcessSandbox {
    config: SandboxConfig,

    /// Injected clock driving the readiness poll
    clock: Arc<dyn Clock>,

    /// RPC port in use (resolved at start when configured as 0)
    rpc_port: u16,

    /// Home directory, present between start and stop
    home: Option<SandboxHome>,

    /// Node process, present between spawn and stop
    child: Option<Child>,

    state: SandboxState,
}

impl ProcessSandbox {
    /// Create a sandbox from its parts
    ///
    /// Prefer `SandboxBuilder`.
    pub fn new(config: SandboxConfig, clock: Arc<dyn Clock>) -> Self {
        let rpc_port = config.rpc_port;
        Self {
            config,
            clock,
            rpc_port,
            home: None,
            child: None,
            state: SandboxState::NotStarted,
        }
    }

    /// Builder with default configuration
    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::new()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configuration this sandbox was built with
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> &SandboxState {
        &self.state
    }

    /// RPC port (0 until a free port has been picked at start)
    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    /// RPC endpoint URL
    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}", self.config.rpc_host, self.rpc_port)
    }

    /// Home directory, if one is allocated
    pub fn home_dir(&self) -> Option<&Path> {
        self.home.as_ref().map(SandboxHome::path)
    }

    /// RPC client bound to this sandbox over HTTP
    pub fn client(&self) -> RpcClient {
        RpcClient::http(self.rpc_url())
    }

    /// Output parser configured with this sandbox's failure heuristic
    pub fn parser(&self) -> TransactionOutputParser {
        TransactionOutputParser::with_heuristic(self.config.failure_heuristic)
    }

    /// True while the node process exists and has not exited
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialise and start the node, returning once it answers `status`
    ///
    /// Does nothing if the node is already running.
    ///
    /// # Errors
    ///
    /// Returns `TestingError::SandboxStartup` if:
    /// - No node binary is configured or found on `PATH`
    /// - `init` fails or times out
    /// - The node exits before becoming ready
    /// - The node does not answer within `startup_timeout`
    ///
    /// On error the sandbox is `Failed`, the node is terminated and a
    /// temporary home directory is removed.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if let SandboxState::Failed(reason) = &self.state {
            return Err(TestingError::SandboxStartup(format!(
                "sandbox already failed: {}",
                reason
            )));
        }

        self.state = SandboxState::Initializing;

        match self.boot().await {
            Ok(()) => {
                self.state = SandboxState::Running;
                if log::log_enabled!(log::Level::Info) {
                    log::info!("Sandbox ready at {}", self.rpc_url());
                }
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("Sandbox startup failed: {}", reason);
                }
                self.teardown().await;
                self.state = SandboxState::Failed(reason);
                Err(e)
            }
        }
    }

    /// Terminate the node and release the home directory
    ///
    /// Idempotent and infallible: safe to call from failure paths. Problems
    /// during shutdown are logged.
    pub async fn stop(&mut self) {
        self.teardown().await;

        if matches!(
            self.state,
            SandboxState::Running | SandboxState::Initializing
        ) {
            self.state = SandboxState::Stopped;
            if log::log_enabled!(log::Level::Info) {
                log::info!("Sandbox stopped");
            }
        }
    }

    async fn boot(&mut self) -> Result<()> {
        if self.config.rpc_port == 0 {
            self.rpc_port = free_local_port()?;
        }

        let node = resolve_node_binary(self.config.node_binary.as_deref())?;

        let home = match &self.config.home_dir {
            Some(path) => SandboxHome::external(path),
            None => SandboxHome::temporary()?,
        };
        let home_path = home.path().to_path_buf();
        self.home = Some(home);

        self.init_node(&node, &home_path).await?;
        patch_rpc_addr(&home_path.join("config.json"), self.rpc_port).await?;
        self.spawn_node(&node, &home_path)?;
        self.wait_for_ready().await
    }

    /// `<node> --home <dir> init --chain-id <chain>`
    async fn init_node(&self, node: &Path, home: &Path) -> Result<()> {
        let args: [&OsStr; 5] = [
            "--home".as_ref(),
            home.as_os_str(),
            "init".as_ref(),
            "--chain-id".as_ref(),
            self.config.chain_id.as_ref(),
        ];

        let output = CommandRunner::new(node)
            .run(args, &BTreeMap::new(), self.config.init_timeout)
            .await
            .map_err(|e| TestingError::SandboxStartup(format!("Sandbox init failed: {}", e)))?;

        if !output.success() {
            return Err(TestingError::SandboxStartup(format!(
                "Sandbox init failed (exit {}): {}",
                describe_code(output.exit_code),
                output.stderr.trim()
            )));
        }

        Ok(())
    }

    /// `<node> --home <dir> run`, detached from our stdio
    fn spawn_node(&mut self, node: &Path, home: &Path) -> Result<()> {
        let mut cmd = Command::new(node);
        cmd.arg("--home")
            .arg(home)
            .arg("run")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Spawning node: {:?}", cmd.as_std());
        }

        let child = cmd.spawn().map_err(|e| {
            TestingError::SandboxStartup(format!("Failed to spawn {}: {}", node.display(), e))
        })?;
        self.child = Some(child);
        Ok(())
    }

    /// Poll `status` until a body with `result` comes back
    async fn wait_for_ready(&mut self) -> Result<()> {
        let probe = HttpTransport::new(self.rpc_url()).with_timeout(self.config.probe_timeout);
        let request = RpcRequest::new(HEALTH_REQUEST_ID, "status", json!([]));
        let deadline = Deadline::after(self.clock.clone(), self.config.startup_timeout);

        while !deadline.expired() {
            if let Some(child) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    return Err(TestingError::SandboxStartup(format!(
                        "Sandbox process exited prematurely with code {}",
                        describe_exit(status)
                    )));
                }
            }

            match probe.post_raw(&request).await {
                Ok(body) if body.get("result").is_some() => return Ok(()),
                Ok(body) => {
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("Node not ready yet: {}", body);
                    }
                }
                Err(e) => {
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("Readiness probe failed: {}", e);
                    }
                }
            }

            deadline.tick(self.config.poll_interval).await;
        }

        Err(TestingError::SandboxStartup(format!(
            "Sandbox did not become ready within {:?}",
            self.config.startup_timeout
        )))
    }

    /// Terminate the child (if any) and release the home (if any)
    async fn teardown(&mut self) {
        if let Some(child) = self.child.take() {
            terminate(child, self.config.shutdown_grace, self.config.kill_grace).await;
        }
        if let Some(home) = self.home.take() {
            home.release();
        }
    }

    // ========================================================================
    // Node access
    // ========================================================================

    /// Environment every CLI invocation runs with
    ///
    /// Caller overrides come first; the computed network variables win.
    fn cli_env(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut env = overrides.clone();
        env.insert("NEAR_ENV".to_string(), self.config.network_id.clone());
        env.insert("NEAR_CLI_LOCALNET_RPC_SERVER_URL".to_string(), self.rpc_url());
        if let Some(home) = self.home_dir() {
            env.insert("NEAR_HOME".to_string(), home.display().to_string());
        }
        env
    }

    /// Run the CLI against this sandbox
    ///
    /// Exit status is returned as data; only spawn failures and timeouts are
    /// errors.
    pub async fn run_external_command<I, S>(
        &self,
        args: I,
        env_overrides: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let env = self.cli_env(env_overrides);
        CommandRunner::new(&self.config.cli_binary)
            .run(args, &env, timeout)
            .await
    }

    /// `run_external_command` with no overrides and the default timeout
    pub async fn run_near_cli<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.run_external_command(args, &BTreeMap::new(), self.config.command_timeout)
            .await
    }

    /// One raw JSON-RPC exchange with the node, returning the whole body
    ///
    /// Always goes over HTTP, never through an intercepted transport.
    pub async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        HttpTransport::new(self.rpc_url())
            .post_raw(&RpcRequest::new(RPC_REQUEST_ID, method, params))
            .await
    }
}

impl std::fmt::Debug for ProcessSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSandbox")
            .field("state", &self.state)
            .field("rpc_url", &self.rpc_url())
            .field("home", &self.home_dir())
            .finish()
    }
}

impl Drop for ProcessSandbox {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("Sandbox dropped while running; killing node");
                }
                let _ = child.start_kill();
            }
        }
    }
}

/// Boxed future returned by `run_in_sandbox` bodies
pub type SandboxFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + 'a>>;

/// Start a sandbox, run `f` against it, and stop it afterwards
///
/// The sandbox is stopped whether `f` succeeds or fails.
///
/// # Example
///
/// ```rust,ignore
/// let balance = run_in_sandbox(SandboxBuilder::new(), |sandbox| {
///     Box::pin(async move {
///         let alice = TestAccount::create(sandbox, "alice.test.near", 10.0).await?;
///         Ok(alice.balance().await)
///     })
/// })
/// .await?;
/// ```
pub async fn run_in_sandbox<T, F>(builder: SandboxBuilder, f: F) -> anyhow::Result<T>
where
    F: for<'a> FnOnce(&'a ProcessSandbox) -> SandboxFuture<'a, T>,
{
    let mut sandbox = builder.start().await?;
    let outcome = f(&sandbox).await;
    sandbox.stop().await;
    outcome
}

/// Ask the OS for a free local TCP port
pub fn free_local_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Configured node binary, else the first candidate found on `PATH`
fn resolve_node_binary(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    NODE_BINARY_CANDIDATES
        .iter()
        .find_map(|name| find_on_path(name))
        .ok_or_else(|| {
            TestingError::SandboxStartup(
                "Neither 'neard' nor 'near-sandbox' binary found on PATH. \
                 Install nearcore or near-sandbox, or configure a node binary."
                    .to_string(),
            )
        })
}

/// Look `name` up on `PATH`
pub(crate) fn find_on_path(name: &str) -> Option<PathBuf> {
    let file_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Rewrite `rpc.addr` in the node config to bind `port`, keeping its host
///
/// A missing config file is left alone.
async fn patch_rpc_addr(config_path: &Path, port: u16) -> Result<()> {
    if !tokio::fs::try_exists(config_path).await? {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("No node config at {:?}, not patching", config_path);
        }
        return Ok(());
    }

    let text = tokio::fs::read_to_string(config_path).await?;
    let mut config: Value = serde_json::from_str(&text)?;

    let host = config
        .get("rpc")
        .and_then(|rpc| rpc.get("addr"))
        .and_then(Value::as_str)
        .and_then(|addr| addr.rsplit_once(':'))
        .map(|(host, _)| host.to_string())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let addr = format!("{}:{}", host, port);

    let root = config.as_object_mut().ok_or_else(|| {
        TestingError::SandboxStartup(format!("{} is not a JSON object", config_path.display()))
    })?;
    let rpc = root.entry("rpc").or_insert_with(|| json!({}));
    if !rpc.is_object() {
        *rpc = json!({});
    }
    rpc["addr"] = Value::String(addr);

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Patched {:?}: rpc.addr = {}", config_path, rpc["addr"]);
    }

    tokio::fs::write(config_path, serde_json::to_string_pretty(&config)?).await?;
    Ok(())
}

/// SIGTERM, wait, then kill and wait again
async fn terminate(mut child: Child, shutdown_grace: Duration, kill_grace: Duration) {
    if let Ok(Some(status)) = child.try_wait() {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Node already exited ({})", describe_exit(status));
        }
        return;
    }

    if request_shutdown(&mut child) {
        match tokio::time::timeout(shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Node exited ({})", describe_exit(status));
                }
                return;
            }
            Ok(Err(e)) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("Failed to wait for node: {}", e);
                }
            }
            Err(_) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!(
                        "Node did not exit within {:?} of SIGTERM, killing",
                        shutdown_grace
                    );
                }
            }
        }
    }

    if let Err(e) = child.start_kill() {
        if log::log_enabled!(log::Level::Warn) {
            log::warn!("Failed to kill node: {}", e);
        }
    }
    if tokio::time::timeout(kill_grace, child.wait()).await.is_err() {
        if log::log_enabled!(log::Level::Warn) {
            log::warn!("Node still running {:?} after kill", kill_grace);
        }
    }
}

/// Send SIGTERM; false if no graceful request could be made
#[cfg(unix)]
fn request_shutdown(child: &mut Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return false;
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("Failed to send SIGTERM to node {}: {}", pid, e);
            }
            false
        }
    }
}

/// No graceful signal off unix; fall through to the forced kill
#[cfg(not(unix))]
fn request_shutdown(_child: &mut Child) -> bool {
    false
}

fn describe_exit(status: ExitStatus) -> String {
    describe_code(status.code())
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}
