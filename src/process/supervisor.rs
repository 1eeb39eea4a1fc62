// ABOUTME: Owns the server child process and its console pipes.
// ABOUTME: Start, send a console line, stop with timeout and forced kill, and liveness queries.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

use super::error::ProcessError;
use super::reader::forward_output;
use crate::notify::Broadcaster;

const LINE_CHANNEL_CAPACITY: usize = 1024;

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process exited on its own after the `stop` command.
    Graceful,
    /// The process was killed after the timeout elapsed.
    Forced,
}

/// A freshly launched server instance.
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: Option<u32>,
    /// Increments on every launch; used to ignore stale end-of-stream notices.
    pub generation: u64,
    /// Merged stdout/stderr lines in emission order. Closes when the process exits.
    pub lines: mpsc::Receiver<String>,
}

struct Attached {
    child: Child,
    generation: u64,
}

/// Supervises at most one server process at a time.
pub struct Supervisor {
    install_dir: PathBuf,
    binary: String,
    child: Mutex<Option<Attached>>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("install_dir", &self.install_dir)
            .field("binary", &self.binary)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Supervisor {
    pub fn new(install_dir: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        Self {
            install_dir: install_dir.into(),
            binary: binary.into(),
            child: Mutex::new(None),
            stdin: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary)
    }

    pub fn binary_exists(&self) -> bool {
        self.binary_path().is_file()
    }

    /// Launch the server in the install directory with piped console streams.
    pub async fn start(&self) -> Result<ProcessHandle, ProcessError> {
        let binary = self.binary_path();
        if !binary.is_file() {
            return Err(ProcessError::BinaryMissing(binary));
        }

        let mut slot_stdin = self.stdin.lock().await;
        let mut slot = self.child.lock();
        if let Some(attached) = slot.as_mut() {
            match attached.child.try_wait() {
                Ok(None) => return Err(ProcessError::AlreadyRunning),
                Ok(Some(status)) => {
                    tracing::debug!("previous server process exited with {}", status);
                }
                Err(e) => {
                    tracing::warn!("could not query previous server process: {}", e);
                }
            }
        }

        let mut child = Command::new(&binary)
            .current_dir(&self.install_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                path: binary.clone(),
                source,
            })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pid = child.id();
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => {
                tokio::spawn(forward_output(stdout, stderr, tx));
            }
            _ => {
                tracing::warn!("server output pipes unavailable");
            }
        }

        *slot_stdin = child.stdin.take();
        *slot = Some(Attached { child, generation });

        tracing::info!(
            "launched {} (pid {:?}, generation {})",
            binary.display(),
            pid,
            generation
        );

        Ok(ProcessHandle {
            pid,
            generation,
            lines: rx,
        })
    }

    /// Write one console line. A broken pipe kills and detaches the process.
    pub async fn send_line(&self, text: &str) -> Result<(), ProcessError> {
        let mut stdin_slot = self.stdin.lock().await;
        let stdin = stdin_slot.as_mut().ok_or(ProcessError::NotRunning)?;

        let mut payload = text.trim_end().as_bytes().to_vec();
        payload.push(b'\n');

        let result = match stdin.write_all(&payload).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            stdin_slot.take();
            drop(stdin_slot);
            tracing::warn!("console write failed, treating server as dead: {}", e);
            let attached = self.child.lock().take();
            if let Some(mut attached) = attached
                && let Err(kill_err) = attached.child.kill().await
            {
                tracing::warn!("failed to kill unresponsive server: {}", kill_err);
            }
            return Err(ProcessError::WriteFailed(e));
        }

        tracing::debug!("console <- {}", text.trim_end());
        Ok(())
    }

    /// Send `stop`, wait up to `timeout` for exit, then kill. Always detaches the process.
    pub async fn stop(&self, timeout: Duration) -> Result<StopOutcome, ProcessError> {
        let stdin = self.stdin.lock().await.take();
        let attached = self.child.lock().take();
        let Some(mut attached) = attached else {
            return Err(ProcessError::NotRunning);
        };

        if let Some(mut stdin) = stdin {
            let sent = match stdin.write_all(b"stop\n").await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                tracing::warn!("could not send stop command: {}", e);
            }
            // Hold stdin open until the process exits.
            let outcome = self.wait_or_kill(&mut attached.child, timeout).await;
            drop(stdin);
            outcome
        } else {
            self.wait_or_kill(&mut attached.child, timeout).await
        }
    }

    async fn wait_or_kill(
        &self,
        child: &mut Child,
        timeout: Duration,
    ) -> Result<StopOutcome, ProcessError> {
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("server exited ({})", status);
                Ok(StopOutcome::Graceful)
            }
            Ok(Err(e)) => {
                tracing::warn!("failed waiting for server exit: {}", e);
                child.kill().await.map_err(ProcessError::Kill)?;
                Ok(StopOutcome::Forced)
            }
            Err(_) => {
                tracing::warn!(
                    "server did not exit within {}s, killing",
                    timeout.as_secs()
                );
                child.kill().await.map_err(ProcessError::Kill)?;
                Ok(StopOutcome::Forced)
            }
        }
    }

    /// Detach and collect the process of `generation` after its output closed.
    /// A newer generation is left alone.
    pub async fn reap(&self, generation: u64) -> Option<ExitStatus> {
        let attached = {
            let mut slot = self.child.lock();
            if slot.as_ref().is_some_and(|a| a.generation == generation) {
                slot.take()
            } else {
                None
            }
        };
        let mut attached = attached?;
        self.stdin.lock().await.take();

        match tokio::time::timeout(Duration::from_secs(5), attached.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("server process exited ({})", status);
                Some(status)
            }
            Ok(Err(e)) => {
                tracing::warn!("failed to collect server exit status: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("server output closed but process still alive, killing");
                if let Err(e) = attached.child.kill().await {
                    tracing::warn!("failed to kill server process: {}", e);
                }
                None
            }
        }
    }

    /// Non-blocking liveness check.
    pub fn is_running(&self) -> bool {
        let mut slot = self.child.lock();
        match slot.as_mut() {
            Some(attached) => matches!(attached.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broadcaster for Supervisor {
    async fn broadcast(&self, message: &str) {
        if let Err(e) = self.send_line(&format!("say {message}")).await {
            tracing::warn!("failed to broadcast '{}': {}", message, e);
        }
    }
}
