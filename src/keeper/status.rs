// ABOUTME: Point-in-time status report: lifecycle, version, players, backups, and busy state.
// ABOUTME: Serializable for JSON output and displayable for the terminal.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::Keeper;
use crate::backup::{BackupTimes, BackupUsage};
use crate::config::ServerProperties;
use crate::console::ServerState;
use crate::lock::LockInfo;
use crate::types::{PlayerName, ServerVersion};

#[derive(Debug, Clone, Serialize)]
pub struct KeeperStatus {
    pub state: ServerState,
    pub version: Option<ServerVersion>,
    pub installed: bool,
    pub online: Vec<PlayerName>,
    pub max_players: Option<u32>,
    pub last_manual_backup: Option<NaiveDateTime>,
    pub last_auto_backup: Option<NaiveDateTime>,
    pub backup_usage: Option<BackupUsage>,
    pub busy: Option<LockInfo>,
    pub countdown_remaining_secs: Option<u64>,
}

impl Keeper {
    pub fn status(&self) -> KeeperStatus {
        let times = BackupTimes::load(&self.paths);
        let max_players = ServerProperties::load(&self.paths.properties_file())
            .ok()
            .and_then(|props| props.max_players());
        let backup_usage = match self.backups.usage() {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::debug!("could not measure backup usage: {}", e);
                None
            }
        };

        KeeperStatus {
            state: self.state(),
            version: self.version(),
            installed: self.binary_exists(),
            online: self.console.roster.lock().online().iter().cloned().collect(),
            max_players,
            last_manual_backup: times.last_manual_backup,
            last_auto_backup: times.last_auto_backup,
            backup_usage,
            busy: self.lock.holder(),
            countdown_remaining_secs: self.board.current().map(|s| s.remaining_secs()),
        }
    }
}

fn or_never(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

impl fmt::Display for KeeperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state:       {}", self.state)?;
        match self.version {
            Some(version) => writeln!(f, "version:     {}", version)?,
            None if self.installed => writeln!(f, "version:     unknown")?,
            None => writeln!(f, "version:     not installed")?,
        }

        let names: Vec<&str> = self.online.iter().map(|n| n.as_str()).collect();
        match self.max_players {
            Some(max) => write!(f, "players:     {}/{}", names.len(), max)?,
            None => write!(f, "players:     {}", names.len())?,
        }
        if names.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, " ({})", names.join(", "))?;
        }

        writeln!(f, "last manual: {}", or_never(self.last_manual_backup))?;
        writeln!(f, "last auto:   {}", or_never(self.last_auto_backup))?;
        if let Some(usage) = &self.backup_usage {
            writeln!(f, "backups:     {}", usage)?;
        }
        if let Some(busy) = &self.busy {
            writeln!(f, "busy:        {} since {}", busy.kind, busy.started_at)?;
        }
        if let Some(remaining) = self.countdown_remaining_secs {
            writeln!(f, "countdown:   {}s remaining", remaining)?;
        }
        Ok(())
    }
}
