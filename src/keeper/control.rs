// ABOUTME: Keeper's server control: launch with a console monitor, stop and await stream close.
// ABOUTME: Keeps lifecycle state in step with every launch and stop the workflows request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::Keeper;
use crate::console::ConsoleMonitor;
use crate::notify::Broadcaster;
use crate::process::{ProcessError, ServerControl, StopOutcome};

/// Upper bound on waiting for a stopped process's output to drain.
const MONITOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

impl Keeper {
    /// Launch the server and attach a console monitor to its output.
    async fn launch(&self) -> Result<(), ProcessError> {
        self.drain_monitor().await;

        let handle = self.supervisor.start().await?;
        self.console
            .update_lifecycle(&self.events, |lc| lc.request_start());

        let monitor = ConsoleMonitor::new(
            self.console.clone(),
            self.events.clone(),
            self.board.clone(),
            Arc::clone(&self.supervisor) as Arc<dyn Broadcaster>,
        );
        let supervisor = Arc::clone(&self.supervisor);
        let generation = handle.generation;
        let lines = handle.lines;
        let task = tokio::spawn(async move {
            monitor.run(lines).await;
            supervisor.reap(generation).await;
        });

        *self.monitor.lock() = Some(task);
        Ok(())
    }

    /// Wait for the previous process's monitor to finish applying its end of stream.
    async fn drain_monitor(&self) {
        let task = self.monitor.lock().take();
        let Some(task) = task else {
            return;
        };

        let abort = task.abort_handle();
        match tokio::time::timeout(MONITOR_DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("console monitor ended abnormally: {}", e),
            Err(_) => {
                tracing::warn!("console output still open after stop, detaching monitor");
                abort.abort();
            }
        }
    }

    /// Apply the implicit stop if nothing else did, e.g. the monitor was detached.
    fn settle_stopped(&self) {
        self.console
            .update_lifecycle(&self.events, |lc| lc.stream_closed(Instant::now()));
    }

    /// Lapse a restart that never saw its relaunch.
    pub fn expire_restart_grace(&self) {
        self.console
            .update_lifecycle(&self.events, |lc| lc.expire_restart(Instant::now()));
    }
}

#[async_trait]
impl ServerControl for Keeper {
    fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    async fn send_command(&self, command: &str) -> Result<(), ProcessError> {
        self.supervisor.send_line(command).await
    }

    async fn stop_server(&self) -> Result<StopOutcome, ProcessError> {
        self.console
            .update_lifecycle(&self.events, |lc| lc.request_stop());
        let outcome = self.supervisor.stop(self.config.server.stop_timeout).await;
        self.drain_monitor().await;
        self.settle_stopped();

        if let Ok(StopOutcome::Forced) = outcome {
            tracing::warn!("server had to be killed");
        }
        outcome
    }

    async fn start_server(&self) -> Result<(), ProcessError> {
        match self.launch().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.console
                    .update_lifecycle(&self.events, |lc| lc.cancel_restart());
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Broadcaster for Keeper {
    async fn broadcast(&self, message: &str) {
        if self.supervisor.is_running() {
            self.supervisor.broadcast(message).await;
        } else {
            tracing::debug!("server not running, not broadcasting '{}'", message);
        }
    }
}
