// ABOUTME: On-disk layout rooted at the keeper's base directory.
// ABOUTME: Install, rollback slot, backup folders, state files, and download temp.

use std::path::{Path, PathBuf};

/// Every directory and state file the keeper touches, derived from one base directory.
#[derive(Debug, Clone)]
pub struct KeeperPaths {
    pub base: PathBuf,
    pub install_dir: PathBuf,
    pub rollback_dir: PathBuf,
    pub data_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub manual_backups: PathBuf,
    pub auto_backups: PathBuf,
    pub settings_backups: PathBuf,
}

impl KeeperPaths {
    pub fn new(base: &Path) -> Self {
        let data_dir = base.join("data");
        let backup_dir = base.join("backup");
        Self {
            base: base.to_path_buf(),
            install_dir: base.join("server_files"),
            rollback_dir: base.join("server_old"),
            temp_dir: data_dir.join("temp"),
            data_dir,
            manual_backups: backup_dir.join("worlds_manual"),
            auto_backups: backup_dir.join("worlds_auto"),
            settings_backups: backup_dir.join("server_settings"),
            backup_dir,
        }
    }

    /// Create every directory the keeper writes into. The install dir is
    /// left alone so a missing install is still detectable.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.data_dir,
            &self.temp_dir,
            &self.backup_dir,
            &self.manual_backups,
            &self.auto_backups,
            &self.settings_backups,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn worlds_dir(&self) -> PathBuf {
        self.install_dir.join("worlds")
    }

    pub fn backup_times_file(&self) -> PathBuf {
        self.data_dir.join("backup_time.json")
    }

    pub fn player_list_file(&self) -> PathBuf {
        self.data_dir.join("player_list.json")
    }

    pub fn allowlist_file(&self) -> PathBuf {
        self.install_dir.join("allowlist.json")
    }

    pub fn permissions_file(&self) -> PathBuf {
        self.install_dir.join("permissions.json")
    }

    pub fn properties_file(&self) -> PathBuf {
        self.install_dir.join("server.properties")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_base() {
        let paths = KeeperPaths::new(Path::new("/srv/bds"));
        assert_eq!(paths.install_dir, Path::new("/srv/bds/server_files"));
        assert_eq!(paths.rollback_dir, Path::new("/srv/bds/server_old"));
        assert_eq!(paths.temp_dir, Path::new("/srv/bds/data/temp"));
        assert_eq!(
            paths.auto_backups,
            Path::new("/srv/bds/backup/worlds_auto")
        );
        assert_eq!(
            paths.worlds_dir(),
            Path::new("/srv/bds/server_files/worlds")
        );
    }

    #[test]
    fn ensure_dirs_leaves_install_dir_absent() {
        let temp = tempfile::tempdir().unwrap();
        let paths = KeeperPaths::new(temp.path());
        paths.ensure_dirs().unwrap();

        assert!(paths.manual_backups.is_dir());
        assert!(paths.temp_dir.is_dir());
        assert!(!paths.install_dir.exists());
    }
}
