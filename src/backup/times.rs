// ABOUTME: Persisted last-manual and last-auto backup timestamps.
// ABOUTME: Reconciled at load against archive filenames so a lost state file self-heals.

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::BackupKind;
use crate::config::{Cadence, KeeperPaths};

const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

static ARCHIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"world_backup_(\d{8}_\d{6})\.zip").expect("constant regex pattern is valid")
});

/// `world_backup_<YYYYMMDD_HHMMSS>.zip`
pub fn archive_file_name(at: NaiveDateTime) -> String {
    format!("world_backup_{}.zip", at.format(ARCHIVE_TIMESTAMP_FORMAT))
}

/// Timestamp embedded in an archive filename.
pub fn parse_archive_time(file_name: &str) -> Option<NaiveDateTime> {
    let stamp = ARCHIVE_NAME.captures(file_name)?.get(1)?.as_str();
    NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIMESTAMP_FORMAT).ok()
}

/// Newest timestamp among archive filenames in `dir`.
pub fn newest_archive_time(dir: &Path) -> Option<NaiveDateTime> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .filter_map(|e| parse_archive_time(&e.file_name().to_string_lossy()))
        .max()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_manual_backup: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_auto_backup: Option<NaiveDateTime>,
}

impl BackupTimes {
    /// Load the state file, then adopt any newer archive timestamps found on disk.
    pub fn load(paths: &KeeperPaths) -> Self {
        let file = paths.backup_times_file();
        let mut times = Self::read(&file);

        let changed = times.reconcile(
            newest_archive_time(&paths.manual_backups),
            newest_archive_time(&paths.auto_backups),
        );
        if changed && let Err(e) = times.save(&file) {
            tracing::warn!("failed to save {}: {}", file.display(), e);
        }
        times
    }

    fn read(file: &Path) -> Self {
        match std::fs::read_to_string(file) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed {}: {}", file.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("failed to read {}: {}", file.display(), e);
                Self::default()
            }
        }
    }

    /// Take the newer of recorded and scanned times. Returns whether anything changed.
    pub fn reconcile(
        &mut self,
        newest_manual: Option<NaiveDateTime>,
        newest_auto: Option<NaiveDateTime>,
    ) -> bool {
        let mut changed = false;
        for (slot, scanned, label) in [
            (&mut self.last_manual_backup, newest_manual, "manual"),
            (&mut self.last_auto_backup, newest_auto, "auto"),
        ] {
            if let Some(scanned) = scanned
                && slot.is_none_or(|recorded| scanned > recorded)
            {
                tracing::info!("latest {} backup from archives: {}", label, scanned);
                *slot = Some(scanned);
                changed = true;
            }
        }
        changed
    }

    pub fn record(&mut self, kind: BackupKind, at: NaiveDateTime) {
        match kind {
            BackupKind::Manual => self.last_manual_backup = Some(at),
            BackupKind::Auto => self.last_auto_backup = Some(at),
        }
    }

    pub fn save(&self, file: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(file, content)
    }
}

/// Whether an automatic backup should run before the first launch.
pub fn needs_startup_backup(
    enabled: bool,
    cadence: &Cadence,
    last_auto: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    if !enabled {
        return false;
    }
    let Some(last) = last_auto else {
        return true;
    };
    now - last >= cadence.period()
}
