// ABOUTME: Online player set and the persistent list of every player ever seen.
// ABOUTME: First-seen players are enrolled into the server's allow-list and permissions files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::KeeperPaths;
use crate::types::{PlayerName, Xuid};

const LAST_ONLINE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_PERMISSION: &str = "member";

/// Entry in `data/player_list.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPlayer {
    pub name: String,
    pub xuid: String,
    pub last_online: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    FirstSeen,
    Returning,
    /// No xuid on the connect line, so the player cannot be tracked.
    Anonymous,
}

#[derive(Debug)]
pub struct Roster {
    online: BTreeSet<PlayerName>,
    known: Vec<KnownPlayer>,
    player_list_file: PathBuf,
    allowlist_file: PathBuf,
    permissions_file: PathBuf,
}

impl Roster {
    /// Load the known-player list; an unreadable file starts an empty list.
    pub fn load(paths: &KeeperPaths) -> Self {
        let player_list_file = paths.player_list_file();
        let known = read_json_list::<KnownPlayer>(&player_list_file);
        Self {
            online: BTreeSet::new(),
            known,
            player_list_file,
            allowlist_file: paths.allowlist_file(),
            permissions_file: paths.permissions_file(),
        }
    }

    pub fn online(&self) -> &BTreeSet<PlayerName> {
        &self.online
    }

    pub fn known(&self) -> &[KnownPlayer] {
        &self.known
    }

    pub fn connected(
        &mut self,
        name: &PlayerName,
        xuid: Option<&Xuid>,
        now: NaiveDateTime,
    ) -> Arrival {
        self.online.insert(name.clone());

        let Some(xuid) = xuid else {
            return Arrival::Anonymous;
        };

        let last_online = now.format(LAST_ONLINE_FORMAT).to_string();
        let arrival = match self.known.iter_mut().find(|p| p.xuid == xuid.as_str()) {
            Some(player) => {
                player.last_online = last_online;
                Arrival::Returning
            }
            None => {
                tracing::info!("new player joined: {} (xuid {})", name, xuid);
                self.known.push(KnownPlayer {
                    name: name.to_string(),
                    xuid: xuid.to_string(),
                    last_online,
                });
                self.enroll(name, xuid);
                Arrival::FirstSeen
            }
        };

        if let Err(e) = write_json(&self.player_list_file, &self.known) {
            tracing::warn!(
                "failed to save {}: {}",
                self.player_list_file.display(),
                e
            );
        }
        arrival
    }

    /// Returns whether the player was online.
    pub fn disconnected(&mut self, name: &PlayerName) -> bool {
        self.online.remove(name)
    }

    pub fn clear_online(&mut self) {
        self.online.clear();
    }

    fn enroll(&self, name: &PlayerName, xuid: &Xuid) {
        let allow_entry = json!({
            "ignoresPlayerLimit": false,
            "name": name.as_str(),
            "xuid": xuid.as_str(),
        });
        if let Err(e) = append_if_absent(&self.allowlist_file, xuid, allow_entry) {
            tracing::warn!("failed to add {} to allow-list: {}", name, e);
        }

        let permission_entry = json!({
            "permission": DEFAULT_PERMISSION,
            "xuid": xuid.as_str(),
        });
        if let Err(e) = append_if_absent(&self.permissions_file, xuid, permission_entry) {
            tracing::warn!("failed to add {} to permissions: {}", name, e);
        }
    }
}

fn read_json_list<T: for<'de> Deserialize<'de>>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("failed to read {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("ignoring malformed {}: {}", path.display(), e);
        Vec::new()
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
}

/// Append `entry` to the JSON array in `path` unless an entry with the same xuid exists.
/// A file that does not parse is left alone and reported as an error.
fn append_if_absent(path: &Path, xuid: &Xuid, entry: Value) -> std::io::Result<()> {
    let mut entries: Vec<Value> = match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    let present = entries
        .iter()
        .any(|e| e.get("xuid").and_then(Value::as_str) == Some(xuid.as_str()));
    if present {
        return Ok(());
    }
    entries.push(entry);
    write_json(path, &entries)
}
