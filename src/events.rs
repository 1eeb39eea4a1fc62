// ABOUTME: Events the keeper publishes for observers (CLI, logs, tests).
// ABOUTME: Delivered on a tokio broadcast bus; slow receivers may lag and drop.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::backup::BackupKind;
use crate::console::ServerState;
use crate::types::{PlayerName, ServerVersion, Xuid};

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KeeperEvent {
    StateChanged {
        from: ServerState,
        to: ServerState,
    },
    VersionDetected {
        version: ServerVersion,
    },
    PlayerJoined {
        name: PlayerName,
        xuid: Option<Xuid>,
    },
    PlayerLeft {
        name: PlayerName,
    },
    PlayerSpawned {
        name: PlayerName,
    },
    ConsoleLine {
        line: String,
    },
    BackupStarted {
        kind: BackupKind,
    },
    BackupCompleted {
        kind: BackupKind,
        size_bytes: u64,
        elapsed_secs: f64,
    },
    BackupFailed {
        kind: BackupKind,
        message: String,
    },
    UpdateProgress {
        stage: String,
    },
    UpdateCompleted {
        version: Option<ServerVersion>,
    },
    UpdateFailed {
        message: String,
    },
    UpdateCancelled,
    CountdownTick {
        remaining_secs: u64,
        message: Option<String>,
    },
}

/// Sender half of the event bus. Publishing never fails, even without receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<KeeperEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: KeeperEvent) {
        tracing::trace!(?event, "publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KeeperEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_receivers_is_silent() {
        let bus = EventBus::new();
        bus.publish(KeeperEvent::UpdateCancelled);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(KeeperEvent::UpdateProgress {
            stage: "downloading".to_string(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            KeeperEvent::UpdateProgress {
                stage: "downloading".to_string()
            }
        );
    }

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_string(&KeeperEvent::UpdateCancelled).unwrap();
        assert_eq!(json, r#"{"event":"update_cancelled"}"#);
    }
}
