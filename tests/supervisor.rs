// ABOUTME: Process supervision tests driving a shell script in place of the server.
// ABOUTME: Line forwarding, graceful and forced stops, and the keeper's lifecycle view.
#![cfg(unix)]

mod support;

use bedrock_keeper::config::{Config, KeeperPaths};
use bedrock_keeper::console::ServerState;
use bedrock_keeper::keeper::Keeper;
use bedrock_keeper::process::{ProcessError, ProcessHandle, StopOutcome, Supervisor};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{ScriptedFeed, init_tracing};

const ETXTBSY: i32 = 26;

const ECHO_SERVER: &str = r#"#!/bin/sh
echo "Starting Server"
echo "Version: 1.21.113.1"
echo "Server started."
while read line; do
  echo "got: $line"
  if [ "$line" = "stop" ]; then
    echo "Quit correctly"
    exit 0
  fi
done
"#;

const STUBBORN_SERVER: &str = r#"#!/bin/sh
echo "Server started."
while true; do sleep 1; done
"#;

fn install_script(dir: &Path, script: &str) {
    std::fs::create_dir_all(dir).unwrap();
    let binary = dir.join("bedrock_server");
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A freshly written script can briefly be "text file busy" under parallel tests.
async fn start(supervisor: &Supervisor) -> ProcessHandle {
    for _ in 0..20 {
        match supervisor.start().await {
            Err(ProcessError::Spawn { source, .. }) if source.raw_os_error() == Some(ETXTBSY) => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            other => return other.unwrap(),
        }
    }
    panic!("server script stayed busy");
}

async fn next_line(handle: &mut ProcessHandle) -> String {
    tokio::time::timeout(Duration::from_secs(5), handle.lines.recv())
        .await
        .expect("line within timeout")
        .expect("stream open")
}

#[tokio::test]
async fn forwards_output_and_stops_gracefully() {
    init_tracing();
    let temp = tempfile::tempdir().unwrap();
    install_script(temp.path(), ECHO_SERVER);
    let supervisor = Supervisor::new(temp.path(), "bedrock_server");

    let mut handle = start(&supervisor).await;
    assert_eq!(next_line(&mut handle).await, "Starting Server");
    assert_eq!(next_line(&mut handle).await, "Version: 1.21.113.1");
    assert_eq!(next_line(&mut handle).await, "Server started.");
    assert!(supervisor.is_running());

    supervisor.send_line("list").await.unwrap();
    assert_eq!(next_line(&mut handle).await, "got: list");

    let outcome = supervisor.stop(Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome, StopOutcome::Graceful);
    assert!(!supervisor.is_running());
    assert!(matches!(
        supervisor.send_line("list").await,
        Err(ProcessError::NotRunning)
    ));
}

#[tokio::test]
async fn unresponsive_server_is_killed_after_timeout() {
    let temp = tempfile::tempdir().unwrap();
    install_script(temp.path(), STUBBORN_SERVER);
    let supervisor = Supervisor::new(temp.path(), "bedrock_server");

    let mut handle = start(&supervisor).await;
    assert_eq!(next_line(&mut handle).await, "Server started.");

    let outcome = supervisor.stop(Duration::from_millis(300)).await.unwrap();
    assert_eq!(outcome, StopOutcome::Forced);
    assert!(!supervisor.is_running());
}

#[tokio::test]
async fn second_start_is_refused() {
    let temp = tempfile::tempdir().unwrap();
    install_script(temp.path(), ECHO_SERVER);
    let supervisor = Supervisor::new(temp.path(), "bedrock_server");

    let _handle = start(&supervisor).await;
    assert!(matches!(
        supervisor.start().await,
        Err(ProcessError::AlreadyRunning)
    ));
    supervisor.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn missing_binary_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(temp.path(), "bedrock_server");

    let err = supervisor.start().await.unwrap_err();
    assert!(matches!(err, ProcessError::BinaryMissing(_)));
    assert!(err.is_informational());
}

async fn wait_for_state(keeper: &Keeper, state: ServerState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while keeper.state() != state {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state {state} not reached, still {}", keeper.state()));
}

#[tokio::test]
async fn keeper_tracks_the_process_lifecycle() {
    init_tracing();
    let temp = tempfile::tempdir().unwrap();
    let paths = KeeperPaths::new(temp.path());
    paths.ensure_dirs().unwrap();
    install_script(&paths.install_dir, ECHO_SERVER);
    let keeper = Keeper::with_feed(
        Config::default(),
        paths,
        Arc::new(ScriptedFeed::new("1.21.113.1", Vec::new())),
    );

    let mut started = keeper.start().await;
    for _ in 0..20 {
        match &started {
            Err(bedrock_keeper::error::Error::Process(ProcessError::Spawn { source, .. }))
                if source.raw_os_error() == Some(ETXTBSY) =>
            {
                tokio::time::sleep(Duration::from_millis(50)).await;
                started = keeper.start().await;
            }
            _ => break,
        }
    }
    started.unwrap();

    wait_for_state(&keeper, ServerState::Running).await;
    assert_eq!(keeper.version().map(|v| v.to_string()), Some("1.21.113.1".into()));
    keeper.send_command("say hi").await.unwrap();

    let outcome = keeper.stop().await.unwrap();
    assert_eq!(outcome, StopOutcome::Graceful);
    assert_eq!(keeper.state(), ServerState::Stopped);
    assert!(!keeper.lock().is_held());
}
