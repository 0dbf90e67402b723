// File: testing-framework/src/utilities/contract_helpers.rs
//
// Smart Contract Testing Helpers
//
// This module deploys compiled WASM contracts to a running sandbox and drives
// them through the `near` CLI: change calls come back as parsed
// `TransactionResult`s, view calls as decoded JSON.

use crate::error::{Result, TestingError};
use crate::tier2_integration::ProcessSandbox;
use crate::transaction::TransactionResult;
use serde_json::Value;
use std::ffi::OsString;
use std::path::Path;

/// Default gas attached to change calls (300 TGas)
pub const DEFAULT_GAS: &str = "300000000000000";

/// Default deposit attached to change calls, in NEAR
pub const DEFAULT_DEPOSIT: &str = "0";

/// Deposit and gas of a change call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Attached deposit in NEAR
    pub deposit: String,
    /// Gas allowance
    pub gas: String,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            deposit: DEFAULT_DEPOSIT.to_string(),
            gas: DEFAULT_GAS.to_string(),
        }
    }
}

impl CallOptions {
    /// Set the attached deposit (NEAR)
    pub fn with_deposit(mut self, deposit: impl Into<String>) -> Self {
        self.deposit = deposit.into();
        self
    }

    /// Set the gas allowance
    pub fn with_gas(mut self, gas: impl Into<String>) -> Self {
        self.gas = gas.into();
        self
    }
}

/// Options of [`ContractDeployer::deploy`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOptions {
    /// Method called right after deployment (e.g. `"new"`)
    pub init_method: Option<String>,
    /// Arguments of the init call (`null` sends `{}`)
    pub init_args: Value,
    /// Deposit and gas of the init call
    pub init_call: CallOptions,
}

impl DeployOptions {
    /// Call `method` with `args` after deploying
    pub fn with_init(mut self, method: impl Into<String>, args: Value) -> Self {
        self.init_method = Some(method.into());
        self.init_args = args;
        self
    }

    /// Deposit attached to the init call (NEAR)
    pub fn with_init_deposit(mut self, deposit: impl Into<String>) -> Self {
        self.init_call.deposit = deposit.into();
        self
    }

    /// Gas attached to the init call
    pub fn with_init_gas(mut self, gas: impl Into<String>) -> Self {
        self.init_call.gas = gas.into();
        self
    }
}

/// Deploys WASM contracts to a sandbox
///
/// # Example
///
/// ```rust,ignore
/// let deployer = ContractDeployer::new(&sandbox);
/// let init = deployer
///     .deploy(
///         "target/wasm32-unknown-unknown/release/counter.wasm",
///         "counter.test.near",
///         DeployOptions::default().with_init("new", json!({"owner_id": "alice.test.near"})),
///     )
///     .await?;
/// assert_transaction_success(&init)?;
/// ```
pub struct ContractDeployer<'a> {
    sandbox: &'a ProcessSandbox,
}

impl<'a> ContractDeployer<'a> {
    /// Deployer for `sandbox`
    pub fn new(sandbox: &'a ProcessSandbox) -> Self {
        Self { sandbox }
    }

    /// Deploy `wasm_path` to `account_id`, then run the optional init call
    ///
    /// Returns the deploy result, or the init call's result when an init
    /// method is given. A failed init call is reported through the returned
    /// result's status, not as an error.
    ///
    /// # Errors
    ///
    /// Returns `TestingError::ContractDeploy` if the artifact does not exist
    /// or the deploy command exits non-zero.
    pub async fn deploy(
        &self,
        wasm_path: impl AsRef<Path>,
        account_id: &str,
        options: DeployOptions,
    ) -> Result<TransactionResult> {
        let wasm_path = wasm_path.as_ref();
        let wasm_path = tokio::fs::canonicalize(wasm_path).await.map_err(|_| {
            TestingError::ContractDeploy(format!("WASM file not found: {}", wasm_path.display()))
        })?;

        if log::log_enabled!(log::Level::Info) {
            log::info!("Deploying {:?} to {}", wasm_path, account_id);
        }

        let args: Vec<OsString> = vec![
            "deploy".into(),
            account_id.into(),
            wasm_path.into_os_string(),
            "--networkId".into(),
            self.sandbox.config().network_id.as_str().into(),
        ];
        let output = self.sandbox.run_near_cli(args).await?;

        if !output.success() {
            return Err(TestingError::ContractDeploy(format!(
                "Contract deployment to {} failed: {}",
                account_id,
                output.diagnostic()
            )));
        }

        let mut deployed = self.sandbox.parser().parse(&output.stdout, &output.stderr);
        deployed.apply_exit_code(output.exit_code);

        match &options.init_method {
            Some(method) => {
                let init = call_contract(
                    self.sandbox,
                    account_id,
                    method,
                    &options.init_args,
                    account_id,
                    &options.init_call,
                )
                .await?;

                if init.failed() && log::log_enabled!(log::Level::Warn) {
                    log::warn!("Init call {}.{} failed", account_id, method);
                }
                Ok(init)
            }
            None => Ok(deployed),
        }
    }
}

/// Send a change call signed by `signer_id`
///
/// The CLI output is parsed with the sandbox's failure heuristic; a non-zero
/// exit code always makes the result a failure.
///
/// # Errors
///
/// Only command-level failures (spawn, timeout) are errors.
pub async fn call_contract(
    sandbox: &ProcessSandbox,
    contract_id: &str,
    method: &str,
    args: &Value,
    signer_id: &str,
    options: &CallOptions,
) -> Result<TransactionResult> {
    let args_json = match args {
        Value::Null => "{}".to_string(),
        args => args.to_string(),
    };

    let output = sandbox
        .run_near_cli([
            "call",
            contract_id,
            method,
            args_json.as_str(),
            "--accountId",
            signer_id,
            "--deposit",
            options.deposit.as_str(),
            "--gas",
            options.gas.as_str(),
            "--networkId",
            sandbox.config().network_id.as_str(),
        ])
        .await?;

    let mut result = sandbox.parser().parse(&output.stdout, &output.stderr);
    result.apply_exit_code(output.exit_code);

    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            "{} -> {}.{}: {} ({})",
            signer_id,
            contract_id,
            method,
            result.status,
            result.hash
        );
    }

    Ok(result)
}

/// Call a view method and decode its return value
///
/// Arguments are only passed when non-empty. Output that is not JSON is
/// returned as a string.
///
/// # Errors
///
/// Returns `TestingError::Transaction` if the CLI exits non-zero.
pub async fn view_contract(
    sandbox: &ProcessSandbox,
    contract_id: &str,
    method: &str,
    args: &Value,
) -> Result<Value> {
    let mut cmd = vec![
        "view".to_string(),
        contract_id.to_string(),
        method.to_string(),
    ];
    if !is_empty_args(args) {
        cmd.push(args.to_string());
    }
    cmd.push("--networkId".to_string());
    cmd.push(sandbox.config().network_id.clone());

    let output = sandbox.run_near_cli(cmd).await?;
    if !output.success() {
        return Err(TestingError::Transaction(format!(
            "View call {}.{} failed: {}",
            contract_id,
            method,
            output.diagnostic()
        )));
    }

    let text = output.stdout.trim();
    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

fn is_empty_args(args: &Value) -> bool {
    match args {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// A deployed contract bound to its sandbox
pub struct ContractHandle<'a> {
    sandbox: &'a ProcessSandbox,
    contract_id: String,
}

impl<'a> ContractHandle<'a> {
    /// Handle to the contract at `contract_id`
    pub fn new(sandbox: &'a ProcessSandbox, contract_id: impl Into<String>) -> Self {
        Self {
            sandbox,
            contract_id: contract_id.into(),
        }
    }

    /// Account the contract lives on
    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// Change call signed by `signer_id`
    pub async fn call(
        &self,
        method: &str,
        args: &Value,
        signer_id: &str,
        options: &CallOptions,
    ) -> Result<TransactionResult> {
        call_contract(self.sandbox, &self.contract_id, method, args, signer_id, options).await
    }

    /// View call
    pub async fn view(&self, method: &str, args: &Value) -> Result<Value> {
        view_contract(self.sandbox, &self.contract_id, method, args).await
    }
}

impl std::fmt::Debug for ContractHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContractHandle").field(&self.contract_id).finish()
    }
}
