// File: testing-framework/src/utilities/accounts.rs
//
// Test Account Helpers
//
// Funded sandbox accounts created through the `near` CLI, with shortcuts for
// calling contracts as that account.

use super::contract_helpers::{call_contract, view_contract, CallOptions};
use crate::error::{Result, TestingError};
use crate::tier2_integration::ProcessSandbox;
use crate::transaction::TransactionResult;
use serde_json::Value;
use std::fmt;

/// Default starting balance of created accounts, in NEAR
pub const DEFAULT_INITIAL_BALANCE: &str = "100";

/// Account on a sandbox
///
/// A borrowed view: it lives no longer than the sandbox and owns no state
/// of its own.
///
/// # Example
///
/// ```rust,ignore
/// let alice = TestAccount::create(&sandbox, "alice.test.near", 10).await?;
/// let result = alice
///     .call("app.test.near", "set_greeting", &json!({"greeting": "hi"}), &CallOptions::default())
///     .await?;
/// assert_transaction_success(&result)?;
/// ```
pub struct TestAccount<'a> {
    sandbox: &'a ProcessSandbox,
    account_id: String,
}

impl<'a> TestAccount<'a> {
    /// Wrap an account that already exists (e.g. `test.near`)
    pub fn new(sandbox: &'a ProcessSandbox, account_id: impl Into<String>) -> Self {
        Self {
            sandbox,
            account_id: account_id.into(),
        }
    }

    /// Create `account_id`, funded by the master account with
    /// `initial_balance` NEAR
    ///
    /// # Errors
    ///
    /// Returns `TestingError::AccountCreation` carrying the CLI output if the
    /// command exits non-zero.
    pub async fn create(
        sandbox: &'a ProcessSandbox,
        account_id: &str,
        initial_balance: impl fmt::Display,
    ) -> Result<TestAccount<'a>> {
        let config = sandbox.config();
        let initial_balance = initial_balance.to_string();

        let output = sandbox
            .run_near_cli([
                "create-account",
                account_id,
                "--masterAccount",
                config.master_account.as_str(),
                "--initialBalance",
                initial_balance.as_str(),
                "--networkId",
                config.network_id.as_str(),
            ])
            .await?;

        if !output.success() {
            return Err(TestingError::AccountCreation {
                account_id: account_id.to_string(),
                output: output.diagnostic().to_string(),
            });
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Created account {} with {} NEAR", account_id, initial_balance);
        }

        Ok(Self::new(sandbox, account_id))
    }

    /// `create` with the default balance of 100 NEAR
    pub async fn create_default(
        sandbox: &'a ProcessSandbox,
        account_id: &str,
    ) -> Result<TestAccount<'a>> {
        Self::create(sandbox, account_id, DEFAULT_INITIAL_BALANCE).await
    }

    /// Account id
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Change call signed by this account
    pub async fn call(
        &self,
        contract_id: &str,
        method: &str,
        args: &Value,
        options: &CallOptions,
    ) -> Result<TransactionResult> {
        call_contract(
            self.sandbox,
            contract_id,
            method,
            args,
            &self.account_id,
            options,
        )
        .await
    }

    /// View call (no signer involved)
    pub async fn view(&self, contract_id: &str, method: &str, args: &Value) -> Result<Value> {
        view_contract(self.sandbox, contract_id, method, args).await
    }

    /// Balance as reported by `state`, or `None` if it cannot be read
    pub async fn balance(&self) -> Option<String> {
        let output = self
            .sandbox
            .run_near_cli([
                "state",
                self.account_id.as_str(),
                "--networkId",
                self.sandbox.config().network_id.as_str(),
            ])
            .await;

        match output {
            Ok(output) if output.success() => {
                parse_state_amount(&format!("{}\n{}", output.stdout, output.stderr))
            }
            Ok(output) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!(
                        "state {} failed: {}",
                        self.account_id,
                        output.diagnostic()
                    );
                }
                None
            }
            Err(e) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("state {} failed: {}", self.account_id, e);
                }
                None
            }
        }
    }
}

impl fmt::Debug for TestAccount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TestAccount").field(&self.account_id).finish()
    }
}

/// First quoted digit string on a line mentioning `amount`
///
/// Matches both `amount: '100000'` and `"amount": "100000"`.
pub(crate) fn parse_state_amount(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.to_lowercase().contains("amount"))
        .find_map(|line| {
            ['\'', '"'].iter().find_map(|quote| {
                line.split(*quote)
                    .find(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
                    .map(str::to_string)
            })
        })
}
