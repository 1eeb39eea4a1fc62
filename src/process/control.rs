// ABOUTME: Narrow view of the supervised server used by backup and update workflows.
// ABOUTME: Implemented by the keeper, which keeps lifecycle state in step with each call.

use async_trait::async_trait;

use super::error::ProcessError;
use super::supervisor::StopOutcome;

#[async_trait]
pub trait ServerControl: Send + Sync {
    fn is_running(&self) -> bool;

    /// Write one console command.
    async fn send_command(&self, command: &str) -> Result<(), ProcessError>;

    /// Stop the server and wait until its output has closed.
    async fn stop_server(&self) -> Result<StopOutcome, ProcessError>;

    /// Launch the server.
    async fn start_server(&self) -> Result<(), ProcessError>;
}
