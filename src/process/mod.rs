// ABOUTME: Supervision of the dedicated server child process.
// ABOUTME: Exposes the supervisor, its launch handle, the control seam, and process errors.

mod control;
mod error;
mod reader;
mod supervisor;

pub use control::ServerControl;
pub use error::ProcessError;
pub use supervisor::{ProcessHandle, StopOutcome, Supervisor};
