// ABOUTME: Storage quota for automatic backups and usage reporting across both folders.
// ABOUTME: Evicts the oldest archives by modification time, never the newest one.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Eviction {
    pub deleted: Vec<PathBuf>,
    pub remaining_bytes: u64,
}

struct ArchiveFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

fn list_archives(dir: &Path) -> std::io::Result<Vec<ArchiveFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "zip") {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        archives.push(ArchiveFile {
            path,
            size: metadata.len(),
            modified: metadata.modified()?,
        });
    }
    archives.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(archives)
}

/// Delete the oldest archives in `dir` while its total size exceeds `quota_bytes`.
pub fn cleanup_old_backups(dir: &Path, quota_bytes: u64) -> std::io::Result<Eviction> {
    let archives = list_archives(dir)?;
    let mut total: u64 = archives.iter().map(|a| a.size).sum();
    let mut deleted = Vec::new();

    let mut remaining = archives.len();
    for archive in archives {
        if total <= quota_bytes || remaining <= 1 {
            break;
        }
        std::fs::remove_file(&archive.path)?;
        tracing::info!(
            "removed old backup {} ({} bytes)",
            archive.path.display(),
            archive.size
        );
        total -= archive.size;
        remaining -= 1;
        deleted.push(archive.path);
    }

    Ok(Eviction {
        deleted,
        remaining_bytes: total,
    })
}

/// Sum of archive sizes directly inside `dir`.
pub fn folder_size(dir: &Path) -> std::io::Result<u64> {
    Ok(list_archives(dir)?.iter().map(|a| a.size).sum())
}

/// Disk used by manual and automatic backups against the configured quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackupUsage {
    pub manual_bytes: u64,
    pub auto_bytes: u64,
    pub quota_bytes: u64,
}

impl BackupUsage {
    pub fn measure(manual_dir: &Path, auto_dir: &Path, quota_bytes: u64) -> std::io::Result<Self> {
        Ok(Self {
            manual_bytes: folder_size(manual_dir)?,
            auto_bytes: folder_size(auto_dir)?,
            quota_bytes,
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.manual_bytes + self.auto_bytes
    }

    /// Share of the quota in use; may exceed 1.0 since manual backups are never trimmed.
    pub fn fraction(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 0.0;
        }
        self.total_bytes() as f64 / self.quota_bytes as f64
    }
}

impl std::fmt::Display for BackupUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const GB: f64 = 1024.0 * 1024.0 * 1024.0;
        write!(
            f,
            "{:.2} GB / {:.2} GB ({:.0}%)",
            self.total_bytes() as f64 / GB,
            self.quota_bytes as f64 / GB,
            self.fraction() * 100.0
        )
    }
}
