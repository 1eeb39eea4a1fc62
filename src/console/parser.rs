// ABOUTME: Turns server console lines into typed events via an ordered matcher list.
// ABOUTME: Non-matching lines yield nothing; parsing never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{PlayerName, ServerVersion, Xuid};

/// Lifecycle milestones announced by the server on its console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTrigger {
    Starting,
    Started,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Lifecycle(LifecycleTrigger),
    VersionDetected(ServerVersion),
    PlayerConnected {
        name: PlayerName,
        xuid: Option<Xuid>,
    },
    PlayerDisconnected {
        name: PlayerName,
    },
    /// The player finished loading into the world.
    PlayerSpawned {
        name: PlayerName,
    },
}

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Version[:\s]+(\d+\.\d+\.\d+\.\d+)").expect("constant regex pattern is valid")
});
static CONNECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Player connected:\s*([^,]+)").expect("constant regex pattern is valid")
});
static XUID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)xuid:\s*(\d+)").expect("constant regex pattern is valid"));
static DISCONNECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Player disconnected:\s*([^,]+)").expect("constant regex pattern is valid")
});
static SPAWNED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Player Spawned:\s*|spawned:\s*)([^,\s]+)")
        .expect("constant regex pattern is valid")
});
static SPAWNED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\S+)\s+spawned").expect("constant regex pattern is valid")
});

type Matcher = fn(&str) -> Option<ConsoleEvent>;

/// Matchers in evaluation order. Each one inspects the line independently.
const MATCHERS: [Matcher; 5] = [
    match_lifecycle,
    match_version,
    match_connected,
    match_disconnected,
    match_spawned,
];

/// Stateless console line parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> Vec<ConsoleEvent> {
        let events: Vec<ConsoleEvent> = MATCHERS.iter().filter_map(|m| m(line)).collect();
        if events.is_empty() {
            tracing::trace!("unmatched console line: {}", line);
        }
        events
    }
}

fn match_lifecycle(line: &str) -> Option<ConsoleEvent> {
    let trigger = if line.contains("Starting Server") {
        LifecycleTrigger::Starting
    } else if line.contains("Server started") || line.contains("Server running") {
        LifecycleTrigger::Started
    } else if line.contains("Stopping server") || line.contains("Stopping Server") {
        LifecycleTrigger::Stopping
    } else if line.contains("Quit correctly") {
        LifecycleTrigger::Stopped
    } else {
        return None;
    };
    Some(ConsoleEvent::Lifecycle(trigger))
}

fn match_version(line: &str) -> Option<ConsoleEvent> {
    let token = VERSION.captures(line)?.get(1)?.as_str();
    match ServerVersion::parse(token) {
        Ok(version) => Some(ConsoleEvent::VersionDetected(version)),
        Err(e) => {
            tracing::debug!("ignoring version token '{}': {}", token, e);
            None
        }
    }
}

fn player_name(raw: &str) -> Option<PlayerName> {
    match PlayerName::new(raw.trim()) {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::debug!("ignoring player name '{}': {}", raw, e);
            None
        }
    }
}

fn match_connected(line: &str) -> Option<ConsoleEvent> {
    let raw = CONNECTED.captures(line)?.get(1)?.as_str();
    let name = player_name(raw)?;
    let xuid = XUID
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| Xuid::new(m.as_str()).ok());
    Some(ConsoleEvent::PlayerConnected { name, xuid })
}

fn match_disconnected(line: &str) -> Option<ConsoleEvent> {
    let raw = DISCONNECTED.captures(line)?.get(1)?.as_str();
    let name = player_name(raw)?;
    Some(ConsoleEvent::PlayerDisconnected { name })
}

fn match_spawned(line: &str) -> Option<ConsoleEvent> {
    if !line.to_lowercase().contains("spawned") {
        return None;
    }
    let captures = SPAWNED
        .captures(line)
        .or_else(|| SPAWNED_SUFFIX.captures(line))?;
    let name = player_name(captures.get(1)?.as_str())?;
    Some(ConsoleEvent::PlayerSpawned { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Vec<ConsoleEvent> {
        LineParser::new().parse(line)
    }

    fn name(value: &str) -> PlayerName {
        PlayerName::new(value).unwrap()
    }

    #[test]
    fn lifecycle_lines() {
        assert_eq!(
            parse("[2025-10-12 21:48:08:511 INFO] Starting Server"),
            vec![ConsoleEvent::Lifecycle(LifecycleTrigger::Starting)]
        );
        assert_eq!(
            parse("[INFO] Server started."),
            vec![ConsoleEvent::Lifecycle(LifecycleTrigger::Started)]
        );
        assert_eq!(
            parse("[INFO] Stopping server..."),
            vec![ConsoleEvent::Lifecycle(LifecycleTrigger::Stopping)]
        );
        assert_eq!(
            parse("Quit correctly"),
            vec![ConsoleEvent::Lifecycle(LifecycleTrigger::Stopped)]
        );
    }

    #[test]
    fn lifecycle_match_is_case_sensitive() {
        assert!(parse("starting server").is_empty());
        assert!(parse("quit correctly").is_empty());
    }

    #[test]
    fn version_line() {
        assert_eq!(
            parse("[2025-10-12 21:48:08:511 INFO] Version: 1.21.113.1"),
            vec![ConsoleEvent::VersionDetected(ServerVersion::new(
                1, 21, 113, 1
            ))]
        );
        assert!(parse("Version: 1.21").is_empty());
    }

    #[test]
    fn connected_with_xuid() {
        assert_eq!(
            parse("[INFO] Player connected: Alice, xuid: 111"),
            vec![ConsoleEvent::PlayerConnected {
                name: name("Alice"),
                xuid: Some(Xuid::new("111").unwrap()),
            }]
        );
    }

    #[test]
    fn connected_name_may_contain_spaces() {
        let events = parse("Player connected: Steve The Great, xuid: 2535412345");
        assert_eq!(
            events,
            vec![ConsoleEvent::PlayerConnected {
                name: name("Steve The Great"),
                xuid: Some(Xuid::new("2535412345").unwrap()),
            }]
        );
    }

    #[test]
    fn disconnected() {
        assert_eq!(
            parse("[INFO] Player disconnected: Alice, xuid: 111, pfid: abc"),
            vec![ConsoleEvent::PlayerDisconnected { name: name("Alice") }]
        );
    }

    #[test]
    fn spawned_forms() {
        assert_eq!(
            parse("[INFO] Player Spawned: Alice xuid: 111, pfid: abc"),
            vec![ConsoleEvent::PlayerSpawned { name: name("Alice") }]
        );
        assert_eq!(
            parse("Bob spawned in the world"),
            vec![ConsoleEvent::PlayerSpawned { name: name("Bob") }]
        );
    }

    #[test]
    fn noise_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("[INFO] Level Name: Bedrock level").is_empty());
        assert!(parse("Player connected:").is_empty());
    }
}
