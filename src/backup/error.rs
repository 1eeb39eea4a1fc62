// ABOUTME: Error types for world backups.
// ABOUTME: A missing world directory is expected before first launch and reported separately.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// No world has been generated yet.
    #[error("world directory not found at {0}")]
    WorldMissing(PathBuf),

    #[error("failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup task failed: {0}")]
    Task(String),
}

impl BackupError {
    /// Expected conditions that should be reported without alarm.
    pub fn is_informational(&self) -> bool {
        matches!(self, BackupError::WorldMissing(_))
    }
}
