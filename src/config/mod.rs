// ABOUTME: Configuration types and parsing for keeper.yml.
// ABOUTME: Backup and update cadences, quota, notification lead times, and paths.

mod cadence;
mod init;
mod paths;
mod properties;
mod server;

pub use cadence::{Cadence, TimeOfDay};
pub use init::init_config;
pub use paths::KeeperPaths;
pub use properties::ServerProperties;
pub use server::ServerSettings;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "keeper.yml";
pub const CONFIG_FILENAME_ALT: &str = "keeper.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".keeper/config.yml";

/// Smallest quota accepted; lower values are clamped up.
pub const MIN_BACKUP_QUOTA_GB: f64 = 0.5;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub update: UpdateSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_backup_cadence")]
    pub cadence: Cadence,

    /// Countdown before a backup, in seconds. Zero skips the notice.
    #[serde(default = "default_backup_notify_seconds")]
    pub notify_seconds: u64,

    /// Ceiling for the automatic backup folder, in GB.
    #[serde(default = "default_max_size_gb")]
    pub max_size_gb: f64,

    /// Wait after `save hold` before reading world files.
    #[serde(default = "default_save_hold_settle", with = "humantime_serde")]
    pub save_hold_settle: Duration,
}

fn default_backup_cadence() -> Cadence {
    Cadence::Hours { hours: 6 }
}

fn default_backup_notify_seconds() -> u64 {
    5
}

fn default_max_size_gb() -> f64 {
    10.0
}

fn default_save_hold_settle() -> Duration {
    Duration::from_secs(2)
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cadence: default_backup_cadence(),
            notify_seconds: default_backup_notify_seconds(),
            max_size_gb: default_max_size_gb(),
            save_hold_settle: default_save_hold_settle(),
        }
    }
}

impl BackupSettings {
    /// Quota in bytes, never below the minimum.
    pub fn quota_bytes(&self) -> u64 {
        let gb = self.max_size_gb.max(MIN_BACKUP_QUOTA_GB);
        (gb * BYTES_PER_GB) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_update_cadence")]
    pub cadence: Cadence,

    /// Countdown before an update, in minutes. Zero updates immediately.
    #[serde(default = "default_update_notify_minutes")]
    pub notify_minutes: u64,

    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    /// `downloadType` tag selecting the release link for this platform.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Filename prefix before the version token, as in `<product>-<version>.zip`.
    #[serde(default = "default_product")]
    pub product: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_update_cadence() -> Cadence {
    Cadence::Daily {
        at: TimeOfDay { hour: 4, minute: 0 },
    }
}

fn default_update_notify_minutes() -> u64 {
    10
}

fn default_metadata_url() -> String {
    "https://net-secondary.web.minecraft-services.net/api/v1.0/download/links".to_string()
}

fn default_platform() -> String {
    if cfg!(windows) {
        "serverBedrockWindows".to_string()
    } else {
        "serverBedrockLinux".to_string()
    }
}

fn default_product() -> String {
    "bedrock-server".to_string()
}

fn default_user_agent() -> String {
    concat!("bedrock-keeper/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cadence: default_update_cadence(),
            notify_minutes: default_update_notify_minutes(),
            metadata_url: default_metadata_url(),
            platform: default_platform(),
            product: default_product(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpdateSettings {
    pub fn notify_seconds(&self) -> u64 {
        self.notify_minutes.saturating_mul(60)
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like `discover`, but a missing file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => {
                tracing::info!(
                    "no {} in {}, using defaults",
                    CONFIG_FILENAME,
                    dir.display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn validate(&mut self) -> Result<()> {
        self.backup
            .cadence
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("backup.cadence: {e}")))?;
        self.update
            .cadence
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("update.cadence: {e}")))?;

        if self.backup.max_size_gb < MIN_BACKUP_QUOTA_GB {
            tracing::warn!(
                "backup.max_size_gb {} below minimum, using {}",
                self.backup.max_size_gb,
                MIN_BACKUP_QUOTA_GB
            );
            self.backup.max_size_gb = MIN_BACKUP_QUOTA_GB;
        }

        if self.server.binary.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "server.binary cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
