// ABOUTME: Tiered, cancellable countdown that broadcasts at decreasing intervals.
// ABOUTME: One tick per second; cancellation is honoured before every tick.

use std::sync::Arc;
use std::time::Duration;

use super::Broadcaster;
use super::board::CountdownSession;
use super::cancel::CancelFlag;
use crate::events::{EventBus, KeeperEvent};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Completed,
    Cancelled,
}

/// Remaining time at which the broadcast after the one at `remaining` is due.
///
/// Every 10 minutes above 30 minutes, every 5 minutes down to 5 minutes,
/// then 1 minute, 30 seconds, every 5 seconds down to 10, then every second.
pub fn next_broadcast_at(remaining: u64) -> u64 {
    match remaining {
        r if r > 30 * 60 => (r - 10 * 60).max(30 * 60),
        r if r > 5 * 60 => (r - 5 * 60).max(5 * 60),
        r if r > 60 => 60,
        r if r > 30 => 30,
        r if r > 10 => (r - 5).max(10),
        r => r.saturating_sub(1),
    }
}

/// Drives one [`CountdownSession`] to completion or cancellation.
pub struct Countdown {
    session: Arc<CountdownSession>,
    events: Option<EventBus>,
}

impl Countdown {
    pub fn new(session: Arc<CountdownSession>) -> Self {
        Self {
            session,
            events: None,
        }
    }

    /// Publish a tick event every second.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session(&self) -> &Arc<CountdownSession> {
        &self.session
    }

    pub async fn run(
        &self,
        broadcaster: &dyn Broadcaster,
        cancel: &CancelFlag,
    ) -> CountdownOutcome {
        let session = &self.session;
        let notice = session.notice();
        let mut remaining = session.total_secs();
        let mut next_at = remaining;

        tracing::info!(
            "{}: countdown started ({}s)",
            notice.log_prefix,
            remaining
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!(
                    "{}: countdown cancelled with {}s remaining",
                    notice.log_prefix,
                    remaining
                );
                return CountdownOutcome::Cancelled;
            }

            session.set_remaining(remaining);
            if remaining == 0 {
                session.set_next_broadcast_at(0);
                tracing::info!("{}: countdown finished", notice.log_prefix);
                return CountdownOutcome::Completed;
            }

            let mut message = None;
            if remaining == next_at {
                let text = notice.scheduled(remaining);
                broadcaster.broadcast(&text).await;
                tracing::debug!("{}: broadcast '{}'", notice.log_prefix, text);
                next_at = next_broadcast_at(remaining);
                message = Some(text);
            }
            session.set_next_broadcast_at(next_at);

            if let Some(events) = &self.events {
                events.publish(KeeperEvent::CountdownTick {
                    remaining_secs: remaining,
                    message,
                });
            }

            tokio::time::sleep(TICK).await;
            remaining -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_step_down() {
        assert_eq!(next_broadcast_at(3600), 3000);
        assert_eq!(next_broadcast_at(2000), 1800);
        assert_eq!(next_broadcast_at(1800), 1500);
        assert_eq!(next_broadcast_at(600), 300);
        assert_eq!(next_broadcast_at(300), 60);
        assert_eq!(next_broadcast_at(60), 30);
        assert_eq!(next_broadcast_at(45), 30);
        assert_eq!(next_broadcast_at(30), 25);
        assert_eq!(next_broadcast_at(12), 10);
        assert_eq!(next_broadcast_at(10), 9);
        assert_eq!(next_broadcast_at(1), 0);
        assert_eq!(next_broadcast_at(0), 0);
    }

    #[test]
    fn next_is_always_below_remaining() {
        for r in 1..=4000 {
            assert!(next_broadcast_at(r) < r, "r = {r}");
        }
    }
}
