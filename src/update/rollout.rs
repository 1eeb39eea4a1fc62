// ABOUTME: Generic rollout struct parameterized by state marker, plus the swap plan and artifact.
// ABOUTME: The plan names the live install, the single rollback slot, and what survives the swap.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::UpdateError;
use super::state::Downloaded;
use crate::config::KeeperPaths;

/// World data and hand-edited settings carried from the old install into the new one.
pub const PRESERVED_ITEMS: [&str; 4] = [
    "worlds",
    "allowlist.json",
    "permissions.json",
    "server.properties",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Pending,
    Ready,
    Failed,
    Cancelled,
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Ready => "ready",
            ArtifactStatus::Failed => "failed",
            ArtifactStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A downloaded release archive, consumed once by the install step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadArtifact {
    pub version: String,
    pub path: PathBuf,
    pub status: ArtifactStatus,
}

impl DownloadArtifact {
    pub fn pending(version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            version: version.into(),
            path: path.into(),
            status: ArtifactStatus::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ArtifactStatus::Ready
    }

    /// Record how the download ended. Only a pending artifact changes.
    pub fn settle(&mut self, status: ArtifactStatus) {
        if self.status == ArtifactStatus::Pending {
            tracing::debug!("download of {} {}", self.version, status);
            self.status = status;
        }
    }

    /// Settle from a download result: cancellation and failure are told apart.
    pub fn settle_from<T>(&mut self, result: &Result<T, UpdateError>) {
        self.settle(match result {
            Ok(_) => ArtifactStatus::Ready,
            Err(UpdateError::Cancelled) => ArtifactStatus::Cancelled,
            Err(_) => ArtifactStatus::Failed,
        });
    }

    /// Delete the archive file. A file that was never written is not an error.
    pub async fn discard(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("removed download {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// On-disk roles during an install swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    /// Live install the supervisor launches from.
    pub current: PathBuf,
    /// Previous install, kept until the next update replaces it.
    pub rollback: PathBuf,
    pub preserved: Vec<String>,
}

impl SwapPlan {
    pub fn new(current: impl Into<PathBuf>, rollback: impl Into<PathBuf>) -> Self {
        Self {
            current: current.into(),
            rollback: rollback.into(),
            preserved: PRESERVED_ITEMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_paths(paths: &KeeperPaths) -> Self {
        Self::new(&paths.install_dir, &paths.rollback_dir)
    }
}

/// An install swap in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(crate) plan: SwapPlan,
    pub(crate) artifact: DownloadArtifact,
    /// Whether the server was running when the rollout stopped it.
    pub(crate) was_running: bool,
    pub(crate) state: S,
}

impl Rollout<Downloaded> {
    pub fn new(plan: SwapPlan, artifact: DownloadArtifact) -> Self {
        Rollout {
            plan,
            artifact,
            was_running: false,
            state: Downloaded,
        }
    }
}

impl<S> Rollout<S> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn plan(&self) -> &SwapPlan {
        &self.plan
    }

    pub fn artifact(&self) -> &DownloadArtifact {
        &self.artifact
    }

    pub fn was_running(&self) -> bool {
        self.was_running
    }

    pub fn version(&self) -> &str {
        &self.artifact.version
    }

    pub fn current_dir(&self) -> &Path {
        &self.plan.current
    }

    pub fn rollback_dir(&self) -> &Path {
        &self.plan.rollback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_tells_cancellation_from_failure() {
        let mut ready = DownloadArtifact::pending("1.0.0.0", "/tmp/a.zip");
        ready.settle_from(&Ok::<u64, UpdateError>(10));
        assert!(ready.is_ready());

        let mut cancelled = DownloadArtifact::pending("1.0.0.0", "/tmp/a.zip");
        cancelled.settle_from::<u64>(&Err(UpdateError::Cancelled));
        assert_eq!(cancelled.status, ArtifactStatus::Cancelled);

        let mut failed = DownloadArtifact::pending("1.0.0.0", "/tmp/a.zip");
        failed.settle_from::<u64>(&Err(UpdateError::Task {
            message: "boom".to_string(),
        }));
        assert_eq!(failed.status, ArtifactStatus::Failed);
    }

    #[test]
    fn settled_artifact_keeps_its_status() {
        let mut artifact = DownloadArtifact::pending("1.0.0.0", "/tmp/a.zip");
        artifact.settle(ArtifactStatus::Ready);
        artifact.settle(ArtifactStatus::Failed);
        assert_eq!(artifact.status, ArtifactStatus::Ready);
        assert_eq!(artifact.status.to_string(), "ready");
    }
}
