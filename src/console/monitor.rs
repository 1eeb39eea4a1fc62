// ABOUTME: Consumes the server's console lines in order and applies them to shared state.
// ABOUTME: Updates lifecycle, version, and roster, publishes events, and sends late-join notices.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::lifecycle::{Lifecycle, ServerState, Transition};
use super::parser::{ConsoleEvent, LifecycleTrigger, LineParser};
use super::roster::Roster;
use crate::events::{EventBus, KeeperEvent};
use crate::notify::{Broadcaster, CountdownBoard};
use crate::types::ServerVersion;

/// Shared facts derived from console output. Only the monitor writes the
/// lifecycle from console lines; the keeper adds explicit start/stop requests.
#[derive(Clone)]
pub struct ConsoleState {
    pub lifecycle: Arc<Mutex<Lifecycle>>,
    pub roster: Arc<Mutex<Roster>>,
    pub version: Arc<Mutex<Option<ServerVersion>>>,
}

impl ConsoleState {
    pub fn new(lifecycle: Lifecycle, roster: Roster) -> Self {
        Self {
            lifecycle: Arc::new(Mutex::new(lifecycle)),
            roster: Arc::new(Mutex::new(roster)),
            version: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.lock().state()
    }

    pub fn version(&self) -> Option<ServerVersion> {
        *self.version.lock()
    }

    /// Apply a state change, publish it, and clear the online set once the process is down.
    pub fn update_lifecycle<F>(&self, events: &EventBus, change: F) -> Option<Transition>
    where
        F: FnOnce(&mut Lifecycle) -> Option<Transition>,
    {
        let transition = change(&mut self.lifecycle.lock());
        if let Some(t) = transition {
            if matches!(t.to, ServerState::Stopped | ServerState::Restarting) {
                self.roster.lock().clear_online();
            }
            events.publish(KeeperEvent::StateChanged {
                from: t.from,
                to: t.to,
            });
        }
        transition
    }
}

pub struct ConsoleMonitor {
    state: ConsoleState,
    parser: LineParser,
    events: EventBus,
    board: CountdownBoard,
    broadcaster: Arc<dyn Broadcaster>,
}

impl ConsoleMonitor {
    pub fn new(
        state: ConsoleState,
        events: EventBus,
        board: CountdownBoard,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            state,
            parser: LineParser::new(),
            events,
            board,
            broadcaster,
        }
    }

    /// Process lines until the channel closes, then apply the implicit stop.
    pub async fn run(self, mut lines: mpsc::Receiver<String>) {
        while let Some(line) = lines.recv().await {
            self.handle_line(&line);
        }
        tracing::debug!("console stream ended");
        self.state
            .update_lifecycle(&self.events, |lc| lc.stream_closed(Instant::now()));
    }

    pub fn handle_line(&self, line: &str) {
        tracing::info!(target: "bedrock_keeper::console", "{}", line);
        self.events.publish(KeeperEvent::ConsoleLine {
            line: line.to_string(),
        });

        for event in self.parser.parse(line) {
            self.apply(event);
        }
    }

    fn apply(&self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::Lifecycle(trigger) => {
                let now = Instant::now();
                self.state
                    .update_lifecycle(&self.events, |lc| lc.apply(trigger, now));
                if trigger == LifecycleTrigger::Started {
                    tracing::info!("server startup complete");
                }
            }
            ConsoleEvent::VersionDetected(version) => {
                let previous = self.state.version.lock().replace(version);
                if previous != Some(version) {
                    tracing::info!("detected server version {}", version);
                }
                self.events
                    .publish(KeeperEvent::VersionDetected { version });
            }
            ConsoleEvent::PlayerConnected { name, xuid } => {
                let now = chrono::Local::now().naive_local();
                self.state.roster.lock().connected(&name, xuid.as_ref(), now);
                tracing::info!("player joined: {}", name);
                self.events.publish(KeeperEvent::PlayerJoined { name, xuid });
            }
            ConsoleEvent::PlayerDisconnected { name } => {
                self.state.roster.lock().disconnected(&name);
                tracing::info!("player left: {}", name);
                self.events.publish(KeeperEvent::PlayerLeft { name });
            }
            ConsoleEvent::PlayerSpawned { name } => {
                if let Some(message) = self.board.late_join_message() {
                    tracing::info!("sending countdown notice to newly joined {}", name);
                    let broadcaster = Arc::clone(&self.broadcaster);
                    tokio::spawn(async move {
                        broadcaster.broadcast(&message).await;
                    });
                }
                self.events.publish(KeeperEvent::PlayerSpawned { name });
            }
        }
    }
}
