// ABOUTME: State transition methods for the install swap.
// ABOUTME: Each method consumes self and returns the next state, or itself plus the error.

use std::path::Path;

use snafu::ResultExt;
use zip::result::ZipError;

use super::error::{ExtractSnafu, ParkSnafu, Recovery, RelaunchSnafu, RestoreSnafu, UpdateError};
use super::rollout::{DownloadArtifact, Rollout};
use super::state::{Completed, Downloaded, Installed, Parked, Restored, RollbackPoint, Stopped};
use crate::process::{ProcessError, ServerControl};

/// Result type for transitions that hand the rollout back on failure.
pub type TransitionResult<T, S> = Result<Rollout<T>, (Rollout<S>, UpdateError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Rollout<S> {
    fn transition<T>(self, state: T) -> Rollout<T> {
        Rollout {
            plan: self.plan,
            artifact: self.artifact,
            was_running: self.was_running,
            state,
        }
    }
}

pub(super) async fn run_blocking<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<std::io::Error> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(E::from(std::io::Error::other(e.to_string()))),
    }
}

/// Extract a release archive into `target`, creating it if needed.
pub(super) fn extract_release(archive_path: &Path, target: &Path) -> Result<(), ZipError> {
    std::fs::create_dir_all(target)?;
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(target)
}

/// Check that a downloaded archive opens, returning its entry count.
pub(super) fn inspect_release(archive_path: &Path) -> Result<usize, ZipError> {
    let file = std::fs::File::open(archive_path)?;
    Ok(zip::ZipArchive::new(file)?.len())
}

/// Recursively copy `src` into `dst`, creating directories as needed.
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn restore_item(from: &Path, to: &Path) -> std::io::Result<bool> {
    if !from.exists() {
        return Ok(false);
    }
    if from.is_dir() {
        if to.exists() {
            std::fs::remove_dir_all(to)?;
        }
        copy_dir_all(from, to)?;
    } else {
        std::fs::copy(from, to)?;
    }
    Ok(true)
}

// =============================================================================
// Downloaded -> Stopped
// =============================================================================

impl Rollout<Downloaded> {
    /// Stop the running server, if any. The live install is untouched on failure.
    #[must_use = "rollout state must be used"]
    pub async fn stop_server(
        mut self,
        control: &dyn ServerControl,
    ) -> TransitionResult<Stopped, Downloaded> {
        self.was_running = control.is_running();
        if self.was_running {
            tracing::info!("stopping server for update to {}", self.version());
            match control.stop_server().await {
                Ok(outcome) => tracing::debug!("server stopped ({:?})", outcome),
                Err(ProcessError::NotRunning) => {}
                Err(source) => return Err((self, UpdateError::Stop { source })),
            }
        }
        Ok(self.transition(Stopped))
    }
}

// =============================================================================
// Stopped -> Parked
// =============================================================================

impl Rollout<Stopped> {
    /// Move the live install into the rollback slot, replacing any previous slot.
    #[must_use = "rollout state must be used"]
    pub async fn park_current(self) -> TransitionResult<Parked, Stopped> {
        let current = self.plan.current.clone();
        let rollback = self.plan.rollback.clone();

        if rollback.exists()
            && let Err(source) = tokio::fs::remove_dir_all(&rollback).await
        {
            return Err((self, UpdateError::Park { path: rollback, source }));
        }

        match tokio::fs::rename(&current, &rollback)
            .await
            .context(ParkSnafu { path: &current })
        {
            Ok(()) => {
                tracing::info!(
                    "moved {} to {}",
                    current.display(),
                    rollback.display()
                );
                Ok(self.transition(Parked))
            }
            Err(e) => Err((self, e)),
        }
    }

    /// Relaunch the untouched install after a failure before the swap, if it was running.
    pub async fn resume(self, control: &dyn ServerControl) -> Result<(), UpdateError> {
        if !self.was_running {
            return Ok(());
        }
        control.start_server().await.context(RelaunchSnafu)
    }
}

// =============================================================================
// Parked -> Installed
// =============================================================================

impl Rollout<Parked> {
    /// Extract the release archive into a fresh live directory.
    #[must_use = "rollout state must be used"]
    pub async fn install(self) -> TransitionResult<Installed, Parked> {
        let archive_path = self.artifact.path.clone();
        let current = self.plan.current.clone();
        let target = current.clone();

        let result = run_blocking(move || extract_release(&archive_path, &target))
            .await
            .context(ExtractSnafu { path: &current });

        match result {
            Ok(()) => {
                tracing::info!("extracted {} into {}", self.version(), current.display());
                Ok(self.transition(Installed))
            }
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// Installed -> Restored
// =============================================================================

impl Rollout<Installed> {
    /// Copy worlds and settings from the rollback slot over the fresh install.
    #[must_use = "rollout state must be used"]
    pub async fn restore_state(self) -> TransitionResult<Restored, Installed> {
        for item in self.plan.preserved.clone() {
            let from = self.plan.rollback.join(&item);
            let to = self.plan.current.join(&item);
            let label = item.clone();

            let result = run_blocking(move || restore_item(&from, &to))
                .await
                .context(RestoreSnafu { item: label });

            match result {
                Ok(true) => tracing::debug!("restored {}", item),
                Ok(false) => tracing::debug!("nothing to restore for {}", item),
                Err(e) => return Err((self, e)),
            }
        }
        Ok(self.transition(Restored))
    }
}

// =============================================================================
// Restored -> Completed
// =============================================================================

impl Rollout<Restored> {
    /// Launch the updated server if the old one was running.
    #[must_use = "rollout state must be used"]
    pub async fn relaunch(
        self,
        control: &dyn ServerControl,
    ) -> TransitionResult<Completed, Restored> {
        if !self.was_running {
            tracing::info!("server was not running before the update; leaving it stopped");
            return Ok(self.transition(Completed));
        }
        match control.start_server().await.context(RelaunchSnafu) {
            Ok(()) => Ok(self.transition(Completed)),
            Err(e) => Err((self, e)),
        }
    }
}

impl Rollout<Completed> {
    /// Hand back the consumed artifact for cleanup.
    pub fn finish(self) -> DownloadArtifact {
        self.artifact
    }
}

// =============================================================================
// Rollback (from any state after the live install was moved aside)
// =============================================================================

impl<S: RollbackPoint> Rollout<S> {
    /// Put the rollback slot back as the live install and try to start it.
    ///
    /// Best effort: a failed restart is reported in the returned [`Recovery`]
    /// and not retried.
    pub async fn roll_back(self, control: &dyn ServerControl) -> Recovery {
        let current = &self.plan.current;
        let rollback = &self.plan.rollback;
        tracing::warn!("rolling back to previous install from {}", rollback.display());

        if control.is_running()
            && let Err(e) = control.stop_server().await
        {
            tracing::warn!("failed to stop server before rollback: {}", e);
        }

        if !rollback.is_dir() {
            return Recovery::ManualIntervention {
                rollback_path: rollback.clone(),
                reason: "rollback slot is missing".to_string(),
            };
        }

        if current.exists()
            && let Err(e) = tokio::fs::remove_dir_all(current).await
        {
            return Recovery::ManualIntervention {
                rollback_path: rollback.clone(),
                reason: format!("could not remove partial install {}: {}", current.display(), e),
            };
        }

        if let Err(e) = tokio::fs::rename(rollback, current).await {
            return Recovery::ManualIntervention {
                rollback_path: rollback.clone(),
                reason: format!("could not move it back to {}: {}", current.display(), e),
            };
        }
        tracing::info!("previous install restored to {}", current.display());

        if !self.was_running {
            return Recovery::Restored { restarted: false };
        }
        match control.start_server().await {
            Ok(()) => Recovery::Restored { restarted: true },
            Err(e) => {
                tracing::error!("failed to restart previous install: {}", e);
                Recovery::Restored { restarted: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_replaces_directories_and_files() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        std::fs::create_dir_all(old.join("worlds/Bedrock level/db")).unwrap();
        std::fs::write(old.join("worlds/Bedrock level/db/CURRENT"), "old-world").unwrap();
        std::fs::write(old.join("server.properties"), "max-players=4\n").unwrap();
        std::fs::create_dir_all(new.join("worlds/default")).unwrap();
        std::fs::write(new.join("server.properties"), "max-players=10\n").unwrap();

        assert!(restore_item(&old.join("worlds"), &new.join("worlds")).unwrap());
        assert!(
            restore_item(
                &old.join("server.properties"),
                &new.join("server.properties")
            )
            .unwrap()
        );
        assert!(!restore_item(&old.join("allowlist.json"), &new.join("allowlist.json")).unwrap());

        assert!(!new.join("worlds/default").exists());
        assert_eq!(
            std::fs::read_to_string(new.join("worlds/Bedrock level/db/CURRENT")).unwrap(),
            "old-world"
        );
        assert_eq!(
            std::fs::read_to_string(new.join("server.properties")).unwrap(),
            "max-players=4\n"
        );
    }
}
