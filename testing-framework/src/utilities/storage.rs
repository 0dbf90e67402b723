// File: testing-framework/src/utilities/storage.rs
//
// Sandbox Home Directory
//
// Every sandbox node needs a home directory for its config, genesis and
// chain data. This module owns that directory: temporary homes are deleted
// when released or dropped, caller-provided homes are left alone.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of temporary sandbox home directories
pub const SANDBOX_HOME_PREFIX: &str = "near-sandbox-";

/// Home directory of a sandbox node
///
/// # Cleanup Behavior
///
/// A temporary home is deleted when:
/// - `release()` is called (the sandbox does this on `stop()`)
/// - The `SandboxHome` goes out of scope, including on test panic
///
/// **Note**: Cleanup may not occur if the process is killed with SIGKILL.
#[derive(Debug)]
pub enum SandboxHome {
    /// Temporary directory owned by the sandbox
    Temporary {
        /// Temporary directory handle (manages cleanup)
        dir: TempDir,
        /// Path of the directory (valid until release)
        path: PathBuf,
    },
    /// Directory supplied by the caller, never deleted
    External(PathBuf),
}

impl SandboxHome {
    /// Create a fresh temporary home directory
    ///
    /// # Errors
    ///
    /// Returns an error if the system cannot create a temporary directory.
    pub fn temporary() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SANDBOX_HOME_PREFIX)
            .tempdir()?;
        let path = dir.path().to_path_buf();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Created temporary sandbox home at: {:?}", path);
        }

        Ok(Self::Temporary { dir, path })
    }

    /// Use a caller-provided directory as home
    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self::External(path.into())
    }

    /// Path of the home directory
    pub fn path(&self) -> &Path {
        match self {
            Self::Temporary { path, .. } => path,
            Self::External(path) => path,
        }
    }

    /// True if this home is deleted on release
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary { .. })
    }

    /// Release the directory, deleting it if temporary
    ///
    /// Removal failures are logged, never returned: release runs on failure
    /// paths where there is nobody left to handle them.
    pub fn release(self) {
        match self {
            Self::Temporary { dir, path } => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Cleaning up temporary sandbox home at: {:?}", path);
                }
                if let Err(e) = dir.close() {
                    if log::log_enabled!(log::Level::Warn) {
                        log::warn!("Failed to remove sandbox home {:?}: {}", path, e);
                    }
                }
            }
            Self::External(path) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Leaving caller-provided sandbox home at: {:?}", path);
                }
            }
        }
    }
}
