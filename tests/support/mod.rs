// ABOUTME: Test support utilities.
// ABOUTME: Recording server fake, scripted release feed, and filesystem fixtures.

// Each test binary only uses some of these helpers, so allow dead_code.
#![allow(dead_code)]

use async_trait::async_trait;
use bedrock_keeper::config::KeeperPaths;
use bedrock_keeper::notify::{Broadcaster, CancelFlag};
use bedrock_keeper::process::{ProcessError, ServerControl, StopOutcome};
use bedrock_keeper::update::{ReleaseFeed, ReleaseInfo, UpdateError};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("bedrock_keeper=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Stands in for the supervised server, recording every interaction.
#[derive(Debug, Default)]
pub struct FakeServer {
    running: AtomicBool,
    commands: Mutex<Vec<String>>,
    broadcasts: Mutex<Vec<String>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeServer {
    pub fn running() -> Self {
        let server = Self::default();
        server.running.store(true, Ordering::SeqCst);
        server
    }

    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_running_now(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerControl for FakeServer {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn send_command(&self, command: &str) -> Result<(), ProcessError> {
        if !self.is_running() {
            return Err(ProcessError::NotRunning);
        }
        self.commands.lock().push(command.to_string());
        Ok(())
    }

    async fn stop_server(&self) -> Result<StopOutcome, ProcessError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ProcessError::NotRunning);
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(StopOutcome::Graceful)
    }

    async fn start_server(&self) -> Result<(), ProcessError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ProcessError::AlreadyRunning);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Broadcaster for FakeServer {
    async fn broadcast(&self, message: &str) {
        self.broadcasts.lock().push(message.to_string());
    }
}

/// Release feed serving a fixed archive from memory.
#[derive(Debug, Clone)]
pub struct ScriptedFeed {
    pub release: ReleaseInfo,
    pub archive: Vec<u8>,
    /// Write half the archive, then wait for cancellation.
    pub stall: bool,
}

impl ScriptedFeed {
    pub fn new(version: &str, archive: Vec<u8>) -> Self {
        Self {
            release: ReleaseInfo {
                version: version.to_string(),
                download_url: format!("https://example.invalid/bedrock-server-{version}.zip"),
            },
            archive,
            stall: false,
        }
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[async_trait]
impl ReleaseFeed for ScriptedFeed {
    async fn latest_release(&self) -> Result<ReleaseInfo, UpdateError> {
        Ok(self.release.clone())
    }

    async fn download(
        &self,
        _release: &ReleaseInfo,
        dest: &Path,
        cancel: &CancelFlag,
    ) -> Result<u64, UpdateError> {
        let write = |bytes: &[u8]| {
            std::fs::write(dest, bytes).map_err(|source| UpdateError::DownloadWrite {
                path: dest.to_path_buf(),
                source,
            })
        };

        if self.stall {
            write(&self.archive[..self.archive.len() / 2])?;
            while !cancel.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let _ = std::fs::remove_file(dest);
            return Err(UpdateError::Cancelled);
        }

        write(&self.archive)?;
        Ok(self.archive.len() as u64)
    }
}

/// In-memory zip with the given entries, in order.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Keeper directory layout under a fresh temp dir.
pub fn keeper_dir() -> (tempfile::TempDir, KeeperPaths) {
    let temp = tempfile::tempdir().unwrap();
    let paths = KeeperPaths::new(temp.path());
    paths.ensure_dirs().unwrap();
    (temp, paths)
}

/// A plausible live install: binary, one world, and the preserved settings files.
pub fn seed_install(paths: &KeeperPaths) {
    let world = paths.worlds_dir().join("Bedrock level");
    std::fs::create_dir_all(world.join("db")).unwrap();
    std::fs::write(world.join("level.dat"), b"level").unwrap();
    std::fs::write(world.join("db").join("000001.ldb"), b"chunks").unwrap();
    std::fs::write(paths.install_dir.join("bedrock_server"), b"old binary").unwrap();
    std::fs::write(paths.properties_file(), "max-players=10\n").unwrap();
    std::fs::write(paths.allowlist_file(), "[]").unwrap();
    std::fs::write(paths.permissions_file(), "[]").unwrap();
}

/// Every file under `root` with its contents, sorted by relative path.
pub fn snapshot_tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let contents = std::fs::read(&path).unwrap();
                files.push((path.strip_prefix(root).unwrap().to_path_buf(), contents));
            }
        }
    }
    files.sort();
    files
}
