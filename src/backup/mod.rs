// ABOUTME: World backups with a storage quota for the automatic set.
// ABOUTME: Archive writing, eviction, persisted timestamps, and settings snapshots.

mod archive;
mod error;
mod executor;
mod quota;
mod settings;
mod times;

pub use archive::archive_dir;
pub use error::{ArchiveError, BackupError};
pub use executor::{BackupExecutor, BackupRecord};
pub use quota::{BackupUsage, Eviction, cleanup_old_backups, folder_size};
pub use settings::{SETTINGS_FILES, snapshot_server_settings};
pub use times::{
    BackupTimes, archive_file_name, needs_startup_backup, newest_archive_time, parse_archive_time,
};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Manual,
    Auto,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Manual => f.write_str("manual"),
            BackupKind::Auto => f.write_str("automatic"),
        }
    }
}
