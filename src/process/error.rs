// ABOUTME: Error types for the supervised server process.
// ABOUTME: Covers a missing binary, double start, dead pipes, and spawn/kill failures.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The server executable is not present in the install directory.
    #[error("server binary not found at {0}")]
    BinaryMissing(PathBuf),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,

    /// Writing to stdin failed; the process has been treated as dead.
    #[error("failed to write to server console: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to kill server process: {0}")]
    Kill(#[source] std::io::Error),
}

impl ProcessError {
    /// Conditions the caller is expected to handle without surfacing a failure.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ProcessError::BinaryMissing(_) | ProcessError::AlreadyRunning | ProcessError::NotRunning
        )
    }
}
