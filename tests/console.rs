// ABOUTME: Console corpus tests: sample server output drives lifecycle, roster, and events.
// ABOUTME: Runs the monitor against the keeper's own state without a live process.

mod support;

use bedrock_keeper::config::Config;
use bedrock_keeper::console::{ConsoleMonitor, ServerState};
use bedrock_keeper::events::KeeperEvent;
use bedrock_keeper::keeper::Keeper;
use bedrock_keeper::types::{PlayerName, ServerVersion, Xuid};
use std::sync::Arc;
use support::{FakeServer, ScriptedFeed, keeper_dir};

fn keeper() -> (tempfile::TempDir, Keeper) {
    let (temp, paths) = keeper_dir();
    let feed = Arc::new(ScriptedFeed::new("1.21.0.1", Vec::new()));
    (temp, Keeper::with_feed(Config::default(), paths, feed))
}

fn monitor(keeper: &Keeper) -> ConsoleMonitor {
    ConsoleMonitor::new(
        keeper.console().clone(),
        keeper.events().clone(),
        keeper.board().clone(),
        Arc::new(FakeServer::running()),
    )
}

fn online(keeper: &Keeper) -> Vec<String> {
    keeper
        .console()
        .roster
        .lock()
        .online()
        .iter()
        .map(|n| n.to_string())
        .collect()
}

#[tokio::test]
async fn join_during_startup_ends_running_with_player_online() {
    let (_temp, keeper) = keeper();
    let monitor = monitor(&keeper);

    for line in [
        "[2025-01-01 10:00:00:000 INFO] Starting Server",
        "[2025-01-01 10:00:00:001 INFO] Version: 1.21.113.1",
        "[2025-01-01 10:00:02:000 INFO] Player connected: Alice, xuid: 111",
        "[2025-01-01 10:00:03:000 INFO] Server started.",
    ] {
        monitor.handle_line(line);
    }

    assert_eq!(keeper.state(), ServerState::Running);
    assert_eq!(online(&keeper), vec!["Alice"]);
    assert_eq!(keeper.version(), Some(ServerVersion::new(1, 21, 113, 1)));
    assert!(!keeper.lock().is_held());
}

#[tokio::test]
async fn events_follow_console_order() {
    let (_temp, keeper) = keeper();
    let mut events = keeper.subscribe();
    let monitor = monitor(&keeper);

    monitor.handle_line("Starting Server");
    monitor.handle_line("Server started.");
    monitor.handle_line("Player connected: Steve Two, xuid: 2535400000000001");
    monitor.handle_line("Player Spawned: Steve xuid: 2535400000000001");

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if !matches!(event, KeeperEvent::ConsoleLine { .. }) {
            seen.push(event);
        }
    }

    assert_eq!(
        seen,
        vec![
            KeeperEvent::StateChanged {
                from: ServerState::Stopped,
                to: ServerState::Starting,
            },
            KeeperEvent::StateChanged {
                from: ServerState::Starting,
                to: ServerState::Running,
            },
            KeeperEvent::PlayerJoined {
                name: PlayerName::new("Steve Two").unwrap(),
                xuid: Some(Xuid::new("2535400000000001").unwrap()),
            },
            KeeperEvent::PlayerSpawned {
                name: PlayerName::new("Steve").unwrap(),
            },
        ]
    );
}

#[tokio::test]
async fn clean_exit_stops_and_clears_roster() {
    let (_temp, keeper) = keeper();
    let monitor = monitor(&keeper);

    monitor.handle_line("Starting Server");
    monitor.handle_line("Server started.");
    monitor.handle_line("Player connected: Alice, xuid: 111");
    monitor.handle_line("Player connected: Bob, xuid: 222");
    monitor.handle_line("Player disconnected: Bob, xuid: 222");
    assert_eq!(online(&keeper), vec!["Alice"]);

    monitor.handle_line("Stopping server...");
    assert_eq!(keeper.state(), ServerState::Stopping);
    monitor.handle_line("Quit correctly");

    assert_eq!(keeper.state(), ServerState::Stopped);
    assert!(online(&keeper).is_empty());
}

#[tokio::test]
async fn first_seen_players_are_remembered() {
    let (temp, keeper) = keeper();
    let monitor = monitor(&keeper);

    monitor.handle_line("Player connected: Alice, xuid: 111");
    monitor.handle_line("Player disconnected: Alice, xuid: 111");
    monitor.handle_line("Player connected: Alice, xuid: 111");

    let known = keeper.console().roster.lock().known().to_vec();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].xuid, "111");
    assert!(keeper.paths().player_list_file().starts_with(temp.path()));
    assert!(keeper.paths().player_list_file().exists());
}

#[tokio::test]
async fn noise_changes_nothing() {
    let (_temp, keeper) = keeper();
    let monitor = monitor(&keeper);

    for line in [
        "",
        "NO LOG FILE! - setting up server logging...",
        "[INFO] Level Name: Bedrock level",
        "[INFO] IPv4 supported, port: 19132",
        "starting server",
    ] {
        monitor.handle_line(line);
    }

    assert_eq!(keeper.state(), ServerState::Stopped);
    assert!(online(&keeper).is_empty());
    assert_eq!(keeper.version(), None);
}
