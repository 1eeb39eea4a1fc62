// ABOUTME: Operation lock preventing overlapping lifecycle, backup, and update workflows.
// ABOUTME: Acquisition fails fast when held; the guard releases on drop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

/// High-level workflows that must never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Start, stop, or restart of the server process.
    Lifecycle,
    Backup,
    Update,
    /// First-time download and extraction of the server.
    Install,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Lifecycle => "lifecycle",
            OperationKind::Backup => "backup",
            OperationKind::Update => "update",
            OperationKind::Install => "install",
        };
        f.write_str(name)
    }
}

/// Information about who holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    pub kind: OperationKind,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LockError {
    #[error("{kind} operation already in progress (since {since})")]
    Held {
        kind: OperationKind,
        since: DateTime<Utc>,
    },
}

/// Process-wide mutual exclusion between keeper workflows.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    slot: Arc<Mutex<Option<LockInfo>>>,
    released: Arc<Notify>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `kind`, or report the current holder.
    pub fn try_acquire(&self, kind: OperationKind) -> Result<OperationGuard, LockError> {
        let mut slot = self.slot.lock();
        if let Some(existing) = *slot {
            return Err(LockError::Held {
                kind: existing.kind,
                since: existing.started_at,
            });
        }

        let info = LockInfo {
            kind,
            started_at: Utc::now(),
        };
        *slot = Some(info);
        tracing::debug!("acquired operation lock for {}", kind);

        Ok(OperationGuard {
            slot: Arc::clone(&self.slot),
            released: Arc::clone(&self.released),
            info,
        })
    }

    pub fn holder(&self) -> Option<LockInfo> {
        *self.slot.lock()
    }

    pub fn is_held(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Wait for the current holder to release, giving up after `poll`.
    pub async fn wait_released(&self, poll: Duration) {
        let released = self.released.notified();
        if !self.is_held() {
            return;
        }
        let _ = tokio::time::timeout(poll, released).await;
    }
}

/// A held operation lock that releases on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct OperationGuard {
    slot: Arc<Mutex<Option<LockInfo>>>,
    released: Arc<Notify>,
    info: LockInfo,
}

impl OperationGuard {
    pub fn kind(&self) -> OperationKind {
        self.info.kind
    }
}

impl fmt::Debug for OperationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationGuard")
            .field("kind", &self.info.kind)
            .field("started_at", &self.info.started_at)
            .finish()
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if *slot == Some(self.info) {
            *slot = None;
            drop(slot);
            self.released.notify_waiters();
            tracing::debug!("released operation lock for {}", self.info.kind);
        }
    }
}
