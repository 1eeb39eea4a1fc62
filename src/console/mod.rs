// ABOUTME: Interpretation of the server's console output.
// ABOUTME: Line parsing, lifecycle state machine, player roster, and the monitor loop.

mod lifecycle;
mod monitor;
mod parser;
mod roster;

pub use lifecycle::{Lifecycle, ServerState, Transition};
pub use monitor::{ConsoleMonitor, ConsoleState};
pub use parser::{ConsoleEvent, LifecycleTrigger, LineParser};
pub use roster::{Arrival, KnownPlayer, Roster};
