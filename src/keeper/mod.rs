// ABOUTME: Keeper facade owning the supervisor, console state, lock, board, and event bus.
// ABOUTME: Every user or scheduled operation goes through here so the operation lock is honoured.

mod control;
mod status;
mod workflows;

pub use status::KeeperStatus;
pub use workflows::{BackupOutcome, Difficulty, RestartOutcome, UpdateAttempt};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backup::BackupExecutor;
use crate::config::{Config, KeeperPaths};
use crate::console::{ConsoleState, Lifecycle, Roster, ServerState};
use crate::error::Result;
use crate::events::{EventBus, KeeperEvent};
use crate::lock::OperationLock;
use crate::notify::{CancelFlag, CountdownBoard};
use crate::process::Supervisor;
use crate::types::ServerVersion;
use crate::update::{HttpReleaseFeed, ReleaseFeed, UpdateOrchestrator};

pub struct Keeper {
    config: Config,
    paths: KeeperPaths,
    supervisor: Arc<Supervisor>,
    console: ConsoleState,
    events: EventBus,
    board: CountdownBoard,
    lock: OperationLock,
    backups: BackupExecutor,
    updates: UpdateOrchestrator,
    monitor: Mutex<Option<JoinHandle<()>>>,
    active_cancel: Mutex<Option<CancelFlag>>,
}

impl Keeper {
    /// Build a keeper that fetches releases over HTTP.
    pub fn new(config: Config, paths: KeeperPaths) -> Result<Self> {
        let feed = HttpReleaseFeed::new(&config.update)?;
        Ok(Self::with_feed(config, paths, Arc::new(feed)))
    }

    pub fn with_feed(config: Config, paths: KeeperPaths, feed: Arc<dyn ReleaseFeed>) -> Self {
        let supervisor = Arc::new(Supervisor::new(
            paths.install_dir.clone(),
            config.server.binary.clone(),
        ));
        let console = ConsoleState::new(
            Lifecycle::new(config.server.restart_grace),
            Roster::load(&paths),
        );
        let backups = BackupExecutor::new(paths.clone(), &config.backup);
        let updates = UpdateOrchestrator::new(paths.clone(), feed);

        Self {
            config,
            paths,
            supervisor,
            console,
            events: EventBus::new(),
            board: CountdownBoard::new(),
            lock: OperationLock::new(),
            backups,
            updates,
            monitor: Mutex::new(None),
            active_cancel: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &KeeperPaths {
        &self.paths
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KeeperEvent> {
        self.events.subscribe()
    }

    pub fn lock(&self) -> &OperationLock {
        &self.lock
    }

    pub fn board(&self) -> &CountdownBoard {
        &self.board
    }

    pub fn console(&self) -> &ConsoleState {
        &self.console
    }

    pub fn state(&self) -> ServerState {
        self.console.state()
    }

    pub fn version(&self) -> Option<ServerVersion> {
        self.console.version()
    }

    pub fn binary_exists(&self) -> bool {
        self.supervisor.binary_exists()
    }

    /// Fresh cancellation flag for a workflow, replacing any previous one.
    fn begin_cancellable(&self) -> CancelFlag {
        let flag = CancelFlag::new();
        *self.active_cancel.lock() = Some(flag.clone());
        flag
    }

    fn end_cancellable(&self) {
        self.active_cancel.lock().take();
    }
}

impl std::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper")
            .field("paths", &self.paths)
            .field("state", &self.state())
            .field("busy", &self.lock.holder())
            .finish()
    }
}
