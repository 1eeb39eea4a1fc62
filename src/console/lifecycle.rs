// ABOUTME: Server lifecycle state machine driven by console triggers and explicit requests.
// ABOUTME: A restarting flag turns a stop into Restarting until the next start or a grace timeout.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::parser::LifecycleTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Between the stop and the start of a restart; observers should not treat this as down.
    Restarting,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ServerState,
    pub to: ServerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartFlag {
    Clear,
    /// Set before the stop; no deadline until the process is down.
    Armed,
    /// Process is down; the flag lapses at the deadline.
    Expiring(Instant),
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ServerState,
    restart: RestartFlag,
    grace: Duration,
}

impl Lifecycle {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: ServerState::Stopped,
            restart: RestartFlag::Clear,
            grace,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_restarting(&self) -> bool {
        self.restart != RestartFlag::Clear
    }

    /// Mark the upcoming stop as the first half of a restart.
    pub fn begin_restart(&mut self) {
        self.restart = RestartFlag::Armed;
    }

    /// Drop the restarting flag, e.g. when the relaunch could not happen.
    pub fn cancel_restart(&mut self) -> Option<Transition> {
        self.restart = RestartFlag::Clear;
        if self.state == ServerState::Restarting {
            return self.move_to(ServerState::Stopped);
        }
        None
    }

    /// The keeper launched the process.
    pub fn request_start(&mut self) -> Option<Transition> {
        match self.state {
            ServerState::Stopped | ServerState::Restarting => self.move_to(ServerState::Starting),
            _ => None,
        }
    }

    /// The keeper asked the process to stop.
    pub fn request_stop(&mut self) -> Option<Transition> {
        match self.state {
            ServerState::Running | ServerState::Starting => self.move_to(ServerState::Stopping),
            _ => None,
        }
    }

    pub fn apply(&mut self, trigger: LifecycleTrigger, now: Instant) -> Option<Transition> {
        match trigger {
            LifecycleTrigger::Starting => self.request_start(),
            LifecycleTrigger::Started => {
                self.restart = RestartFlag::Clear;
                match self.state {
                    ServerState::Starting | ServerState::Restarting | ServerState::Stopped => {
                        self.move_to(ServerState::Running)
                    }
                    _ => None,
                }
            }
            LifecycleTrigger::Stopping => self.request_stop(),
            LifecycleTrigger::Stopped => self.process_down(now),
        }
    }

    /// Output stream closed; treated as an implicit stop.
    pub fn stream_closed(&mut self, now: Instant) -> Option<Transition> {
        self.process_down(now)
    }

    /// Lapse the restarting flag once its grace period has passed.
    pub fn expire_restart(&mut self, now: Instant) -> Option<Transition> {
        let RestartFlag::Expiring(deadline) = self.restart else {
            return None;
        };
        if now < deadline {
            return None;
        }
        tracing::warn!("restart grace period elapsed without the server starting");
        self.restart = RestartFlag::Clear;
        if self.state == ServerState::Restarting {
            self.move_to(ServerState::Stopped)
        } else {
            None
        }
    }

    fn process_down(&mut self, now: Instant) -> Option<Transition> {
        match (self.state, self.restart) {
            (ServerState::Stopped | ServerState::Restarting, _) => None,
            (_, RestartFlag::Clear) => self.move_to(ServerState::Stopped),
            (_, _) => {
                self.restart = RestartFlag::Expiring(now + self.grace);
                self.move_to(ServerState::Restarting)
            }
        }
    }

    fn move_to(&mut self, to: ServerState) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        tracing::info!("server state: {} -> {}", from, to);
        Some(Transition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> Lifecycle {
        Lifecycle::new(Duration::from_secs(10))
    }

    #[test]
    fn full_cycle() {
        let now = Instant::now();
        let mut lc = lifecycle();
        let steps = [
            (LifecycleTrigger::Starting, ServerState::Starting),
            (LifecycleTrigger::Started, ServerState::Running),
            (LifecycleTrigger::Stopping, ServerState::Stopping),
            (LifecycleTrigger::Stopped, ServerState::Stopped),
        ];
        for (trigger, expected) in steps {
            assert_eq!(lc.apply(trigger, now).map(|t| t.to), Some(expected));
        }
    }

    #[test]
    fn restart_flag_redirects_stop() {
        let now = Instant::now();
        let mut lc = lifecycle();
        lc.request_start();
        lc.apply(LifecycleTrigger::Started, now);
        lc.begin_restart();
        lc.request_stop();
        lc.apply(LifecycleTrigger::Stopped, now);
        assert_eq!(lc.state(), ServerState::Restarting);

        // Trailing end of stream from the old process changes nothing.
        assert_eq!(lc.stream_closed(now), None);

        lc.request_start();
        assert_eq!(lc.state(), ServerState::Starting);
        lc.apply(LifecycleTrigger::Started, now);
        assert_eq!(lc.state(), ServerState::Running);
        assert!(!lc.is_restarting());
    }

    #[test]
    fn restart_grace_expires_to_stopped() {
        let now = Instant::now();
        let mut lc = lifecycle();
        lc.request_start();
        lc.apply(LifecycleTrigger::Started, now);
        lc.begin_restart();
        lc.stream_closed(now);
        assert_eq!(lc.state(), ServerState::Restarting);

        assert_eq!(lc.expire_restart(now + Duration::from_secs(5)), None);
        let t = lc.expire_restart(now + Duration::from_secs(10)).unwrap();
        assert_eq!(t.to, ServerState::Stopped);
        assert!(!lc.is_restarting());
    }

    #[test]
    fn end_of_stream_never_leaves_stopping() {
        let now = Instant::now();
        let mut lc = lifecycle();
        lc.request_start();
        lc.apply(LifecycleTrigger::Started, now);
        lc.apply(LifecycleTrigger::Stopping, now);
        lc.stream_closed(now);
        assert_eq!(lc.state(), ServerState::Stopped);
    }

    #[test]
    fn stopped_trigger_while_stopped_is_noop() {
        let mut lc = lifecycle();
        assert_eq!(lc.apply(LifecycleTrigger::Stopped, Instant::now()), None);
        assert_eq!(lc.state(), ServerState::Stopped);
    }
}
