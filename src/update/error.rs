// ABOUTME: Update error types with SNAFU context selectors.
// ABOUTME: Failures after the install swap carry the outcome of the automatic recovery.

use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

use crate::process::ProcessError;

/// What automatic recovery achieved after a failed install swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Previous install is live again.
    Restored { restarted: bool },
    /// The rollback slot could not be put back; an operator must act.
    ManualIntervention { rollback_path: PathBuf, reason: String },
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::Restored { restarted: true } => {
                f.write_str("previous install restored and restarted")
            }
            Recovery::Restored { restarted: false } => {
                f.write_str("previous install restored; server not restarted")
            }
            Recovery::ManualIntervention {
                rollback_path,
                reason,
            } => write!(
                f,
                "manual intervention required: previous install is at {} ({})",
                rollback_path.display(),
                reason
            ),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UpdateError {
    #[snafu(display("failed to build HTTP client: {source}"))]
    Client { source: reqwest::Error },

    #[snafu(display("failed to fetch release metadata from {url}: {source}"))]
    MetadataFetch { url: String, source: reqwest::Error },

    #[snafu(display("release metadata request to {url} returned HTTP {status}"))]
    MetadataStatus { url: String, status: u16 },

    #[snafu(display("release metadata is not valid JSON: {source}"))]
    MetadataParse { source: reqwest::Error },

    #[snafu(display("release metadata has no '{platform}' download link"))]
    MissingPlatformLink { platform: String },

    #[snafu(display("no version token in download URL {url}"))]
    VersionToken { url: String },

    #[snafu(display("download from {url} failed: {source}"))]
    Download { url: String, source: reqwest::Error },

    #[snafu(display("download from {url} returned HTTP {status}"))]
    DownloadStatus { url: String, status: u16 },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    DownloadWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("download cancelled"))]
    Cancelled,

    #[snafu(display("downloaded archive {} is unreadable: {source}", path.display()))]
    InvalidArchive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[snafu(display("failed to stop the server: {source}"))]
    Stop { source: ProcessError },

    #[snafu(display("failed to move {} aside: {source}", path.display()))]
    Park {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to extract release into {}: {source}", path.display()))]
    Extract {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[snafu(display("failed to restore {item}: {source}"))]
    Restore {
        item: String,
        source: std::io::Error,
    },

    #[snafu(display("failed to start the updated server: {source}"))]
    Relaunch { source: ProcessError },

    #[snafu(display("{message}; {recovery}"))]
    Swap { message: String, recovery: Recovery },

    #[snafu(display("background task failed: {message}"))]
    Task { message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    /// Release metadata could not be fetched or understood.
    Metadata,
    /// Archive could not be downloaded or read.
    Download,
    /// User cancelled during the notice period.
    Cancelled,
    /// Failure before the live install was touched.
    PreSwap,
    /// Swap failed and the previous install is back.
    RolledBack,
    /// Swap failed and the rollback slot needs an operator.
    ManualIntervention,
}

impl UpdateError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            UpdateError::Client { .. }
            | UpdateError::MetadataFetch { .. }
            | UpdateError::MetadataStatus { .. }
            | UpdateError::MetadataParse { .. }
            | UpdateError::MissingPlatformLink { .. }
            | UpdateError::VersionToken { .. } => UpdateErrorKind::Metadata,
            UpdateError::Download { .. }
            | UpdateError::DownloadStatus { .. }
            | UpdateError::DownloadWrite { .. }
            | UpdateError::InvalidArchive { .. } => UpdateErrorKind::Download,
            UpdateError::Cancelled => UpdateErrorKind::Cancelled,
            UpdateError::Swap {
                recovery: Recovery::ManualIntervention { .. },
                ..
            } => UpdateErrorKind::ManualIntervention,
            UpdateError::Swap { .. } => UpdateErrorKind::RolledBack,
            UpdateError::Stop { .. }
            | UpdateError::Park { .. }
            | UpdateError::Extract { .. }
            | UpdateError::Restore { .. }
            | UpdateError::Relaunch { .. }
            | UpdateError::Task { .. } => UpdateErrorKind::PreSwap,
        }
    }

    /// Cancellation is an expected outcome, not a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, UpdateError::Cancelled)
    }

    /// Rollback slot an operator must restore by hand, if recovery failed.
    pub fn manual_rollback_path(&self) -> Option<&PathBuf> {
        match self {
            UpdateError::Swap {
                recovery: Recovery::ManualIntervention { rollback_path, .. },
                ..
            } => Some(rollback_path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_errors_name_the_rollback_path() {
        let err = UpdateError::Swap {
            message: "failed to extract release".to_string(),
            recovery: Recovery::ManualIntervention {
                rollback_path: PathBuf::from("/srv/server_old"),
                reason: "rename failed".to_string(),
            },
        };
        assert_eq!(err.kind(), UpdateErrorKind::ManualIntervention);
        assert!(err.to_string().contains("/srv/server_old"));
        assert_eq!(
            err.manual_rollback_path(),
            Some(&PathBuf::from("/srv/server_old"))
        );
    }

    #[test]
    fn restored_swap_is_rolled_back() {
        let err = UpdateError::Swap {
            message: "boom".to_string(),
            recovery: Recovery::Restored { restarted: true },
        };
        assert_eq!(err.kind(), UpdateErrorKind::RolledBack);
        assert!(err.manual_rollback_path().is_none());
    }

    #[test]
    fn cancellation_is_informational() {
        assert!(UpdateError::Cancelled.is_informational());
        assert_eq!(UpdateError::Cancelled.kind(), UpdateErrorKind::Cancelled);
    }
}
