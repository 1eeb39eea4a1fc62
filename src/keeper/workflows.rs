// ABOUTME: High-level keeper operations: start, stop, restart, backup, update, install.
// ABOUTME: Each takes the operation lock first; notice countdowns are cancellable via `cancel`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::Keeper;
use crate::backup::{BackupError, BackupKind, BackupRecord, BackupTimes, needs_startup_backup};
use crate::error::{Error, Result};
use crate::events::KeeperEvent;
use crate::lock::{LockError, OperationKind};
use crate::notify::{
    Broadcaster, CancelFlag, Countdown, CountdownOutcome, Notice, format_duration_words,
};
use crate::process::{ProcessError, ServerControl, StopOutcome};
use crate::types::ServerVersion;
use crate::update::{DownloadArtifact, UpdateCheck, UpdateContext, UpdateOutcome, UpdateReport};

/// How often `shutdown` re-raises cancellation while a workflow holds the lock.
const SHUTDOWN_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartOutcome {
    Restarted,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackupOutcome {
    Completed(BackupRecord),
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateAttempt {
    /// The published release is not newer than the running one.
    NotNeeded(UpdateCheck),
    Cancelled,
    Installed(UpdateReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "peaceful" | "0" => Ok(Difficulty::Peaceful),
            "easy" | "1" => Ok(Difficulty::Easy),
            "normal" | "2" => Ok(Difficulty::Normal),
            "hard" | "3" => Ok(Difficulty::Hard),
            _ => Err(Error::InvalidDifficulty(value.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Peaceful => "peaceful",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl Keeper {
    async fn notice_period(
        &self,
        total_secs: u64,
        notice: Notice,
        cancel: &CancelFlag,
    ) -> CountdownOutcome {
        if total_secs == 0 || !self.is_running() {
            return CountdownOutcome::Completed;
        }
        let session = self.board.begin(total_secs, notice);
        let outcome = Countdown::new(Arc::clone(&session))
            .with_events(self.events.clone())
            .run(self, cancel)
            .await;
        self.board.finish(&session);
        outcome
    }

    /// Launch the server.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.lock.try_acquire(OperationKind::Lifecycle)?;
        if self.is_running() {
            return Err(ProcessError::AlreadyRunning.into());
        }
        self.start_server().await?;
        Ok(())
    }

    /// Stop the server, killing it if it ignores `stop` past the timeout.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let _guard = self.lock.try_acquire(OperationKind::Lifecycle)?;
        Ok(self.stop_server().await?)
    }

    /// Stop then start, optionally announcing it to players first.
    pub async fn restart(&self, with_notice: bool) -> Result<RestartOutcome> {
        let _guard = self.lock.try_acquire(OperationKind::Lifecycle)?;
        let cancel = self.begin_cancellable();
        let notice_secs = if with_notice {
            self.config.server.restart_notice_seconds
        } else {
            0
        };
        let countdown = self.notice_period(notice_secs, Notice::restart(), &cancel).await;
        self.end_cancellable();
        if countdown == CountdownOutcome::Cancelled {
            return Ok(RestartOutcome::Cancelled);
        }

        if self.is_running() {
            self.console
                .update_lifecycle(&self.events, |lc| {
                    lc.begin_restart();
                    None
                });
            if let Err(e) = self.stop_server().await {
                self.console
                    .update_lifecycle(&self.events, |lc| lc.cancel_restart());
                return Err(e.into());
            }
            tokio::time::sleep(self.config.server.relaunch_delay).await;
        }

        self.start_server().await?;
        tracing::info!("server restarted");
        Ok(RestartOutcome::Restarted)
    }

    /// Archive the world, optionally after a player notice.
    pub async fn backup(&self, kind: BackupKind, notify: bool) -> Result<BackupOutcome> {
        let _guard = self.lock.try_acquire(OperationKind::Backup)?;
        let cancel = self.begin_cancellable();
        let notice_secs = if notify {
            self.config.backup.notify_seconds
        } else {
            0
        };
        let countdown = self.notice_period(notice_secs, Notice::backup(), &cancel).await;
        self.end_cancellable();
        if countdown == CountdownOutcome::Cancelled {
            tracing::info!("{} backup cancelled", kind);
            return Ok(BackupOutcome::Cancelled);
        }

        self.events.publish(KeeperEvent::BackupStarted { kind });
        match self.backups.backup(kind, self).await {
            Ok(record) => {
                let took = format_duration_words(record.elapsed.as_secs());
                self.broadcast(&format!("Backup completed, took {took}")).await;
                self.events.publish(KeeperEvent::BackupCompleted {
                    kind,
                    size_bytes: record.size_bytes,
                    elapsed_secs: record.elapsed.as_secs_f64(),
                });
                if let Ok(usage) = self.backups.usage() {
                    tracing::info!("backup storage: {}", usage);
                }
                Ok(BackupOutcome::Completed(record))
            }
            Err(e) => {
                if e.is_informational() {
                    tracing::info!("{} backup skipped: {}", kind, e);
                } else {
                    tracing::error!("{} backup failed: {}", kind, e);
                }
                self.events.publish(KeeperEvent::BackupFailed {
                    kind,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Run an automatic backup before first launch if one is overdue.
    pub async fn startup_backup_if_due(&self) -> Result<Option<BackupRecord>> {
        let times = BackupTimes::load(&self.paths);
        let now = chrono::Local::now().naive_local();
        let settings = &self.config.backup;
        if !needs_startup_backup(settings.enabled, &settings.cadence, times.last_auto_backup, now) {
            return Ok(None);
        }

        tracing::info!("automatic backup is overdue, backing up before launch");
        match self.backup(BackupKind::Auto, false).await {
            Ok(BackupOutcome::Completed(record)) => Ok(Some(record)),
            Ok(BackupOutcome::Cancelled) => Ok(None),
            Err(Error::Backup(BackupError::WorldMissing(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn check_for_update(&self) -> Result<UpdateCheck> {
        Ok(self.updates.check_for_update(self.version()).await?)
    }

    /// Update to the latest release if it is newer, or unconditionally with `force`.
    pub async fn update(&self, notify: bool, force: bool) -> Result<UpdateAttempt> {
        let _guard = self.lock.try_acquire(OperationKind::Update)?;
        let check = self.updates.check_for_update(self.version()).await?;
        if !force && !check.is_newer() {
            return Ok(UpdateAttempt::NotNeeded(check));
        }

        let notify_secs = if notify && self.is_running() {
            self.config.update.notify_seconds()
        } else {
            0
        };
        let cancel = self.begin_cancellable();
        let ctx = UpdateContext {
            control: self,
            broadcaster: self,
            board: &self.board,
            events: &self.events,
            cancel: &cancel,
        };
        let result = self
            .updates
            .perform_update(&check.latest, notify_secs, &ctx)
            .await;
        self.end_cancellable();

        match result {
            Ok(UpdateOutcome::Completed(report)) => {
                let version = ServerVersion::parse(&report.version).ok();
                if let Some(version) = version {
                    self.console.version.lock().replace(version);
                }
                self.events.publish(KeeperEvent::UpdateCompleted { version });
                Ok(UpdateAttempt::Installed(report))
            }
            Ok(UpdateOutcome::Cancelled) => {
                self.events.publish(KeeperEvent::UpdateCancelled);
                Ok(UpdateAttempt::Cancelled)
            }
            Err(e) => {
                tracing::error!("update failed: {}", e);
                self.events.publish(KeeperEvent::UpdateFailed {
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Download and unpack the latest release into an empty install directory.
    pub async fn install_latest(&self) -> Result<DownloadArtifact> {
        let _guard = self.lock.try_acquire(OperationKind::Install)?;
        if self.is_running() {
            return Err(ProcessError::AlreadyRunning.into());
        }
        let release = self.updates.feed().latest_release().await?;
        let cancel = self.begin_cancellable();
        let result = self.updates.install_fresh(&release, &cancel).await;
        self.end_cancellable();
        Ok(result?)
    }

    /// Cancel the notice countdown or download in progress. Returns whether one was active.
    pub fn cancel(&self) -> bool {
        match self.active_cancel.lock().as_ref() {
            Some(flag) => {
                flag.cancel();
                tracing::info!("cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Pass a console command through unchanged.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        Ok(ServerControl::send_command(self, command).await?)
    }

    pub async fn change_difficulty(&self, difficulty: Difficulty) -> Result<()> {
        ServerControl::send_command(self, &format!("difficulty {difficulty}")).await?;
        tracing::info!("difficulty set to {}", difficulty);
        Ok(())
    }

    /// Cancel any notice period, let a running workflow finish or roll back, then stop the
    /// server. The lock stays held until the server is down so nothing new can start.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel();
        let mut announced = false;
        let _guard = loop {
            // Re-raised every pass: a workflow may install its flag after the first cancel
            if let Some(flag) = self.active_cancel.lock().as_ref() {
                flag.cancel();
            }
            match self.lock.try_acquire(OperationKind::Lifecycle) {
                Ok(guard) => break guard,
                Err(LockError::Held { kind, .. }) => {
                    if !announced {
                        tracing::info!("waiting for {} operation to finish before shutdown", kind);
                        announced = true;
                    }
                    self.lock.wait_released(SHUTDOWN_POLL).await;
                }
            }
        };
        if !self.is_running() {
            return Ok(());
        }
        match self.stop_server().await {
            Ok(_) | Err(ProcessError::NotRunning) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
