// ABOUTME: Server process settings: binary name and stop/restart timings.
// ABOUTME: Defaults match the stock Bedrock dedicated server layout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Executable name inside the install directory.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// How long `stop` waits for a natural exit before killing the process.
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// How long the restarting flag survives without a "started" line.
    #[serde(default = "default_restart_grace", with = "humantime_serde")]
    pub restart_grace: Duration,

    /// Pause between the old process exiting and the new one launching.
    #[serde(default = "default_relaunch_delay", with = "humantime_serde")]
    pub relaunch_delay: Duration,

    /// Countdown broadcast before a notified restart, in seconds.
    #[serde(default = "default_restart_notice_seconds")]
    pub restart_notice_seconds: u64,
}

fn default_binary() -> String {
    if cfg!(windows) {
        "bedrock_server.exe".to_string()
    } else {
        "bedrock_server".to_string()
    }
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_restart_grace() -> Duration {
    Duration::from_secs(10)
}

fn default_relaunch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_restart_notice_seconds() -> u64 {
    30
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            stop_timeout: default_stop_timeout(),
            restart_grace: default_restart_grace(),
            relaunch_delay: default_relaunch_delay(),
            restart_notice_seconds: default_restart_notice_seconds(),
        }
    }
}
