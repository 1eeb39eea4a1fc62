// ABOUTME: Observable countdown session and the board holding the active one.
// ABOUTME: Late-join queries read remaining time and the next scheduled broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::message::Notice;

/// Gap to the next scheduled broadcast above which a joining player gets an immediate message.
pub const LATE_JOIN_GAP_SECS: u64 = 60;

/// One running countdown, updated every second by the countdown loop.
#[derive(Debug)]
pub struct CountdownSession {
    total_secs: u64,
    notice: Notice,
    remaining: AtomicU64,
    next_broadcast_at: AtomicU64,
}

impl CountdownSession {
    pub fn new(total_secs: u64, notice: Notice) -> Self {
        Self {
            total_secs,
            notice,
            remaining: AtomicU64::new(total_secs),
            next_broadcast_at: AtomicU64::new(total_secs),
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn notice(&self) -> &Notice {
        &self.notice
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn next_broadcast_at(&self) -> u64 {
        self.next_broadcast_at.load(Ordering::SeqCst)
    }

    pub(super) fn set_remaining(&self, remaining: u64) {
        self.remaining.store(remaining, Ordering::SeqCst);
    }

    pub(super) fn set_next_broadcast_at(&self, at: u64) {
        self.next_broadcast_at.store(at, Ordering::SeqCst);
    }

    /// Seconds until the next scheduled broadcast.
    pub fn gap_to_next_broadcast(&self) -> u64 {
        self.remaining_secs()
            .saturating_sub(self.next_broadcast_at())
    }

    /// Out-of-band message for a player who just joined, if the next
    /// scheduled broadcast is too far away.
    pub fn late_join_message(&self) -> Option<String> {
        let remaining = self.remaining_secs();
        if remaining == 0 || self.gap_to_next_broadcast() <= LATE_JOIN_GAP_SECS {
            return None;
        }
        Some(self.notice.exact(remaining))
    }
}

/// Slot for the countdown currently in progress, if any.
#[derive(Debug, Clone, Default)]
pub struct CountdownBoard {
    active: Arc<Mutex<Option<Arc<CountdownSession>>>>,
}

impl CountdownBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh session, replacing any previous one.
    pub fn begin(&self, total_secs: u64, notice: Notice) -> Arc<CountdownSession> {
        let session = Arc::new(CountdownSession::new(total_secs, notice));
        *self.active.lock() = Some(Arc::clone(&session));
        session
    }

    /// Remove `session` if it is still the active one.
    pub fn finish(&self, session: &Arc<CountdownSession>) {
        let mut active = self.active.lock();
        if active
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            *active = None;
        }
    }

    pub fn current(&self) -> Option<Arc<CountdownSession>> {
        self.active.lock().clone()
    }

    pub fn late_join_message(&self) -> Option<String> {
        self.current()
            .and_then(|session| session.late_join_message())
    }
}
