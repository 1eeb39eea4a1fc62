// ABOUTME: Runs a notified update: countdown and download in parallel, then the install swap.
// ABOUTME: Cancellation is honoured until the swap begins; swap failures roll back automatically.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use snafu::ResultExt;

use super::check::{UpdateCheck, check_for_update};
use super::error::{
    DownloadWriteSnafu, ExtractSnafu, InvalidArchiveSnafu, UpdateError,
};
use super::feed::{ReleaseFeed, ReleaseInfo};
use super::rollout::{ArtifactStatus, DownloadArtifact, Rollout, SwapPlan};
use super::state::RollbackPoint;
use super::transitions::{extract_release, inspect_release, run_blocking};
use crate::backup::snapshot_server_settings;
use crate::config::KeeperPaths;
use crate::diagnostics::{Diagnostics, Warning};
use crate::events::{EventBus, KeeperEvent};
use crate::notify::{Broadcaster, CancelFlag, Countdown, CountdownBoard, CountdownOutcome, Notice};
use crate::process::ServerControl;
use crate::types::ServerVersion;

/// Collaborators an update drives while it runs.
pub struct UpdateContext<'a> {
    pub control: &'a dyn ServerControl,
    pub broadcaster: &'a dyn Broadcaster,
    pub board: &'a CountdownBoard,
    pub events: &'a EventBus,
    pub cancel: &'a CancelFlag,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub version: String,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Completed(UpdateReport),
    Cancelled,
}

pub struct UpdateOrchestrator {
    paths: KeeperPaths,
    feed: Arc<dyn ReleaseFeed>,
}

impl UpdateOrchestrator {
    pub fn new(paths: KeeperPaths, feed: Arc<dyn ReleaseFeed>) -> Self {
        Self { paths, feed }
    }

    pub fn feed(&self) -> &dyn ReleaseFeed {
        self.feed.as_ref()
    }

    pub async fn check_for_update(
        &self,
        current: Option<ServerVersion>,
    ) -> Result<UpdateCheck, UpdateError> {
        check_for_update(self.feed.as_ref(), current).await
    }

    fn artifact_for(&self, release: &ReleaseInfo) -> DownloadArtifact {
        DownloadArtifact::pending(
            release.version.clone(),
            self.paths.temp_dir.join(release.file_name()),
        )
    }

    async fn prepare_temp_dir(&self) -> Result<(), UpdateError> {
        let temp_dir = &self.paths.temp_dir;
        tokio::fs::create_dir_all(temp_dir)
            .await
            .context(DownloadWriteSnafu { path: temp_dir })
    }

    /// Download on a separate task so the countdown keeps ticking. The artifact
    /// comes back settled as ready, failed, or cancelled.
    fn spawn_download(
        &self,
        release: &ReleaseInfo,
        artifact: DownloadArtifact,
        cancel: &CancelFlag,
    ) -> tokio::task::JoinHandle<(DownloadArtifact, Result<u64, UpdateError>)> {
        let feed = Arc::clone(&self.feed);
        let release = release.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut artifact = artifact;
            let result = feed.download(&release, &artifact.path, &cancel).await;
            artifact.settle_from(&result);
            (artifact, result)
        })
    }

    async fn discard(&self, artifact: &DownloadArtifact, diag: &mut Diagnostics) {
        tracing::debug!(
            "discarding {} download of {}",
            artifact.status,
            artifact.version
        );
        if let Err(e) = artifact.discard().await {
            diag.warn(Warning::temp_cleanup(format!(
                "failed to remove {}: {}",
                artifact.path.display(),
                e
            )));
        }
    }

    /// Update the live install to `release`, announcing it `notify_secs` ahead.
    ///
    /// Returns `UpdateOutcome::Cancelled` if `ctx.cancel` is raised before the
    /// swap begins; the live install and the temp directory are then left as
    /// they were before the call.
    pub async fn perform_update(
        &self,
        release: &ReleaseInfo,
        notify_secs: u64,
        ctx: &UpdateContext<'_>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let started = Instant::now();
        let mut diag = Diagnostics::default();
        let artifact = self.artifact_for(release);

        self.prepare_temp_dir().await?;
        progress(ctx.events, "downloading");
        let download = self.spawn_download(release, artifact.clone(), ctx.cancel);

        let countdown = if notify_secs > 0 {
            let session = ctx.board.begin(notify_secs, Notice::update());
            let outcome = Countdown::new(Arc::clone(&session))
                .with_events(ctx.events.clone())
                .run(ctx.broadcaster, ctx.cancel)
                .await;
            ctx.board.finish(&session);
            outcome
        } else {
            CountdownOutcome::Completed
        };

        let (mut artifact, downloaded) = match download.await {
            Ok(settled) => settled,
            Err(e) => {
                let result = Err(UpdateError::Task {
                    message: e.to_string(),
                });
                let mut artifact = artifact;
                artifact.settle_from::<u64>(&result);
                (artifact, result)
            }
        };

        match (countdown, downloaded) {
            (CountdownOutcome::Cancelled, _) | (_, Err(UpdateError::Cancelled)) => {
                // A finished download is abandoned along with the countdown
                artifact.status = ArtifactStatus::Cancelled;
                self.discard(&artifact, &mut diag).await;
                tracing::info!("update to {} cancelled", release.version);
                return Ok(UpdateOutcome::Cancelled);
            }
            (_, Err(e)) => {
                self.discard(&artifact, &mut diag).await;
                return Err(e);
            }
            (CountdownOutcome::Completed, Ok(_)) => {}
        }

        let archive_path = artifact.path.clone();
        if let Err(e) = run_blocking(move || inspect_release(&archive_path))
            .await
            .context(InvalidArchiveSnafu {
                path: &artifact.path,
            })
        {
            artifact.status = ArtifactStatus::Failed;
            self.discard(&artifact, &mut diag).await;
            return Err(e);
        }

        self.snapshot_settings(&mut diag).await;

        self.swap(artifact, ctx, &mut diag).await?;

        Ok(UpdateOutcome::Completed(UpdateReport {
            version: release.version.clone(),
            elapsed: started.elapsed(),
            warnings: diag.into_warnings(),
        }))
    }

    async fn snapshot_settings(&self, diag: &mut Diagnostics) {
        let install_dir = self.paths.install_dir.clone();
        let dest = self.paths.settings_backups.clone();
        let now = chrono::Local::now().naive_local();
        let result =
            tokio::task::spawn_blocking(move || snapshot_server_settings(&install_dir, &dest, now))
                .await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => diag.warn(Warning::settings_snapshot(format!(
                "failed to snapshot server settings: {}",
                e
            ))),
            Err(e) => diag.warn(Warning::settings_snapshot(format!(
                "settings snapshot task failed: {}",
                e
            ))),
        }
    }

    /// Non-cancellable phase: stop, park, extract, restore, relaunch.
    async fn swap(
        &self,
        artifact: DownloadArtifact,
        ctx: &UpdateContext<'_>,
        diag: &mut Diagnostics,
    ) -> Result<(), UpdateError> {
        if !artifact.is_ready() {
            return Err(UpdateError::Task {
                message: format!("download of {} is {}", artifact.version, artifact.status),
            });
        }
        let rollout = Rollout::new(SwapPlan::from_paths(&self.paths), artifact);

        progress(ctx.events, "stopping");
        let stopped = match rollout.stop_server(ctx.control).await {
            Ok(stopped) => stopped,
            Err((rollout, e)) => {
                self.discard(rollout.artifact(), diag).await;
                return Err(e);
            }
        };

        progress(ctx.events, "swapping");
        let parked = match stopped.park_current().await {
            Ok(parked) => parked,
            Err((stopped, e)) => {
                let artifact = stopped.artifact().clone();
                if let Err(restart) = stopped.resume(ctx.control).await {
                    diag.warn(Warning::relaunch(restart.to_string()));
                }
                self.discard(&artifact, diag).await;
                return Err(e);
            }
        };

        let installed = match parked.install().await {
            Ok(installed) => installed,
            Err((parked, e)) => return Err(self.recover(parked, e, ctx, diag).await),
        };

        let restored = match installed.restore_state().await {
            Ok(restored) => restored,
            Err((installed, e)) => return Err(self.recover(installed, e, ctx, diag).await),
        };

        progress(ctx.events, "starting");
        let completed = match restored.relaunch(ctx.control).await {
            Ok(completed) => completed,
            Err((restored, e)) => return Err(self.recover(restored, e, ctx, diag).await),
        };

        let artifact = completed.finish();
        self.discard(&artifact, diag).await;
        tracing::info!("update to {} installed", artifact.version);
        Ok(())
    }

    async fn recover<S: RollbackPoint>(
        &self,
        rollout: Rollout<S>,
        error: UpdateError,
        ctx: &UpdateContext<'_>,
        diag: &mut Diagnostics,
    ) -> UpdateError {
        tracing::error!("update failed during install swap: {}", error);
        progress(ctx.events, "rolling back");
        let artifact = rollout.artifact().clone();
        let recovery = rollout.roll_back(ctx.control).await;
        self.discard(&artifact, diag).await;
        UpdateError::Swap {
            message: error.to_string(),
            recovery,
        }
    }

    /// Download and unpack `release` into an empty or missing install directory.
    pub async fn install_fresh(
        &self,
        release: &ReleaseInfo,
        cancel: &CancelFlag,
    ) -> Result<DownloadArtifact, UpdateError> {
        let mut diag = Diagnostics::default();
        let mut artifact = self.artifact_for(release);

        self.prepare_temp_dir().await?;
        tracing::info!(
            "installing {} into {}",
            release.version,
            self.paths.install_dir.display()
        );
        let downloaded = self.feed.download(release, &artifact.path, cancel).await;
        artifact.settle_from(&downloaded);
        downloaded?;

        let archive_path = artifact.path.clone();
        let target = self.paths.install_dir.clone();
        let extracted = run_blocking(move || extract_release(&archive_path, &target))
            .await
            .context(ExtractSnafu {
                path: &self.paths.install_dir,
            });
        if extracted.is_err() {
            artifact.status = ArtifactStatus::Failed;
        }
        self.discard(&artifact, &mut diag).await;
        extracted?;

        tracing::info!("installed {}", release.version);
        Ok(artifact)
    }
}

fn progress(events: &EventBus, stage: &str) {
    tracing::info!("update: {}", stage);
    events.publish(KeeperEvent::UpdateProgress {
        stage: stage.to_string(),
    });
}
