// ABOUTME: Player notification countdowns ahead of disruptive operations.
// ABOUTME: Tiered broadcasts, cooperative cancellation, and late-join catch-up messages.

mod board;
mod cancel;
mod countdown;
mod message;

pub use board::{CountdownBoard, CountdownSession, LATE_JOIN_GAP_SECS};
pub use cancel::CancelFlag;
pub use countdown::{Countdown, CountdownOutcome, next_broadcast_at};
pub use message::{Notice, format_duration_words, format_remaining};

use async_trait::async_trait;

/// Something that can show a message to every connected player.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Deliver `message` to players. Failures are logged by the implementation.
    async fn broadcast(&self, message: &str);
}
