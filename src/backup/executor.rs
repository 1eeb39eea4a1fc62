// ABOUTME: Runs one world backup: save barrier, archive, resume, quota eviction.
// ABOUTME: `save resume` is always sent after a successful `save hold`, even when archiving fails.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::archive::archive_dir;
use super::error::BackupError;
use super::quota::{BackupUsage, Eviction, cleanup_old_backups};
use super::times::{BackupTimes, archive_file_name};
use super::BackupKind;
use crate::config::{BackupSettings, KeeperPaths};
use crate::process::ServerControl;

/// Outcome of a completed backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub kind: BackupKind,
    pub started_at: NaiveDateTime,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub size_bytes: u64,
    pub archive_path: PathBuf,
    /// Automatic archives removed to stay under the quota.
    pub evicted: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BackupExecutor {
    paths: KeeperPaths,
    quota_bytes: u64,
    save_hold_settle: Duration,
}

impl BackupExecutor {
    pub fn new(paths: KeeperPaths, settings: &BackupSettings) -> Self {
        Self {
            paths,
            quota_bytes: settings.quota_bytes(),
            save_hold_settle: settings.save_hold_settle,
        }
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    pub fn target_dir(&self, kind: BackupKind) -> PathBuf {
        match kind {
            BackupKind::Manual => self.paths.manual_backups.clone(),
            BackupKind::Auto => self.paths.auto_backups.clone(),
        }
    }

    pub async fn backup(
        &self,
        kind: BackupKind,
        control: &dyn ServerControl,
    ) -> Result<BackupRecord, BackupError> {
        let started_at = chrono::Local::now().naive_local();
        let timer = Instant::now();

        let worlds = self.paths.worlds_dir();
        if !worlds.is_dir() {
            tracing::info!("no world to back up at {}", worlds.display());
            return Err(BackupError::WorldMissing(worlds));
        }

        tracing::info!("starting {} backup", kind);

        let held = control.is_running() && self.hold_saves(control).await;
        if held {
            tokio::time::sleep(self.save_hold_settle).await;
        }

        let dest_dir = self.target_dir(kind);
        let archive_path = dest_dir.join(archive_file_name(started_at));
        let archived = self.write_archive(worlds, dest_dir, archive_path.clone()).await;

        if held && let Err(e) = control.send_command("save resume").await {
            tracing::warn!("failed to resume saving: {}", e);
        }

        let size_bytes = archived?;

        let eviction = match kind {
            BackupKind::Auto => {
                match cleanup_old_backups(&self.paths.auto_backups, self.quota_bytes) {
                    Ok(eviction) => eviction,
                    Err(e) => {
                        tracing::warn!("failed to trim automatic backups: {}", e);
                        Eviction::default()
                    }
                }
            }
            BackupKind::Manual => Eviction::default(),
        };

        let mut times = BackupTimes::load(&self.paths);
        times.record(kind, started_at);
        if let Err(e) = times.save(&self.paths.backup_times_file()) {
            tracing::warn!("failed to save backup times: {}", e);
        }

        let record = BackupRecord {
            kind,
            started_at,
            elapsed: timer.elapsed(),
            size_bytes,
            archive_path,
            evicted: eviction.deleted,
        };
        tracing::info!(
            "{} backup complete: {} ({} bytes, {:.1}s)",
            kind,
            record.archive_path.display(),
            record.size_bytes,
            record.elapsed.as_secs_f64()
        );
        Ok(record)
    }

    async fn hold_saves(&self, control: &dyn ServerControl) -> bool {
        match control.send_command("save hold").await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("could not pause saving, archiving live files: {}", e);
                false
            }
        }
    }

    async fn write_archive(
        &self,
        worlds: PathBuf,
        dest_dir: PathBuf,
        archive_path: PathBuf,
    ) -> Result<u64, BackupError> {
        let task = tokio::task::spawn_blocking(move || -> Result<u64, BackupError> {
            std::fs::create_dir_all(&dest_dir)?;
            match archive_dir(&worlds, &archive_path) {
                Ok(size) => Ok(size),
                Err(source) => {
                    let _ = std::fs::remove_file(&archive_path);
                    Err(BackupError::Archive {
                        path: archive_path,
                        source,
                    })
                }
            }
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(BackupError::Task(e.to_string())),
        }
    }

    pub fn usage(&self) -> std::io::Result<BackupUsage> {
        BackupUsage::measure(
            &self.paths.manual_backups,
            &self.paths.auto_backups,
            self.quota_bytes,
        )
    }
}
