// File: testing-framework/src/utilities/command.rs
//
// External Command Runner
//
// Thin wrapper around `tokio::process::Command` that runs a program with an
// environment overlay and a hard timeout, and hands back whatever it printed.
// It never decides whether the command "worked"; callers do.

use crate::error::{Result, TestingError};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for CLI invocations
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout (lossy UTF-8)
    pub stdout: String,
    /// Captured stderr (lossy UTF-8)
    pub stderr: String,
}

impl CommandOutput {
    /// True if the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr if non-empty, stdout otherwise
    ///
    /// This is what error messages quote when a command fails.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Runs one external program with a fixed base environment
///
/// # Example
///
/// ```rust,ignore
/// let runner = CommandRunner::new("near");
/// let output = runner
///     .run(["state", "alice.test.near"], &BTreeMap::new(), Duration::from_secs(10))
///     .await?;
/// if !output.success() {
///     eprintln!("near-cli said: {}", output.diagnostic());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
}

impl CommandRunner {
    /// Create a runner for `program` (a path or a name looked up on `PATH`)
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this runner executes
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the program with `args`, the inherited environment plus `env`
    ///
    /// # Errors
    ///
    /// * `TestingError::CommandSpawn` if the program cannot be started
    /// * `TestingError::CommandTimeout` if it does not exit within `timeout`
    ///   (the child is killed)
    ///
    /// A non-zero exit code is not an error; inspect `CommandOutput`.
    pub async fn run<I, S>(
        &self,
        args: I,
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.program.display().to_string();

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Running command: {:?}", cmd.as_std());
        }

        let child = cmd.spawn().map_err(|source| TestingError::CommandSpawn {
            program: program.clone(),
            source,
        })?;

        // Dropping the output future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("Command `{}` timed out after {:?}", program, timeout);
                }
                return Err(TestingError::CommandTimeout { program, timeout });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Command `{}` exited with {:?}", program, result.exit_code);
        }

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> CommandRunner {
        CommandRunner::new("sh")
    }

    #[tokio::test]
    async fn test_captures_stdout_stderr_and_code() {
        let output = sh()
            .run(
                ["-c", "echo out; echo err >&2; exit 3"],
                &BTreeMap::new(),
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.success());
        assert_eq!(output.diagnostic(), "err");
    }

    #[tokio::test]
    async fn test_env_overlay() {
        let mut env = BTreeMap::new();
        env.insert("NEAR_TESTING_PROBE".to_string(), "probe-value".to_string());

        let output = sh()
            .run(["-c", "printf %s \"$NEAR_TESTING_PROBE\""], &env, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "probe-value");
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_error() {
        let err = sh()
            .run(["-c", "sleep 5"], &BTreeMap::new(), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, TestingError::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = CommandRunner::new("/nonexistent/near-cli-binary")
            .run(["--help"], &BTreeMap::new(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, TestingError::CommandSpawn { .. }));
    }

    #[test]
    fn test_diagnostic_falls_back_to_stdout() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: " only stdout \n".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(output.diagnostic(), "only stdout");
    }
}
