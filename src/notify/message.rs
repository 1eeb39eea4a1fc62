// ABOUTME: Broadcast wording for countdowns.
// ABOUTME: Whole minutes above a minute, seconds below, with singular/plural units.

/// Caller-supplied wording for one countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Sentence prefix, e.g. `Update in`.
    pub headline: String,
    /// Prefix for log lines about this countdown.
    pub log_prefix: String,
}

impl Notice {
    pub fn new(headline: impl Into<String>, log_prefix: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            log_prefix: log_prefix.into(),
        }
    }

    pub fn update() -> Self {
        Self::new("Update in", "update")
    }

    pub fn backup() -> Self {
        Self::new("Backup will begin in", "backup")
    }

    pub fn restart() -> Self {
        Self::new("Server restart in", "restart")
    }

    /// Scheduled broadcast text for `remaining` seconds.
    pub fn scheduled(&self, remaining: u64) -> String {
        format!("{} {}", self.headline, format_remaining(remaining))
    }

    /// Exact text for a late-joining player.
    pub fn exact(&self, remaining: u64) -> String {
        format!("{} {}", self.headline, format_duration_words(remaining))
    }
}

fn unit(value: u64, singular: &str) -> String {
    if value == 1 {
        format!("{value} {singular}")
    } else {
        format!("{value} {singular}s")
    }
}

/// `5 minutes` at or above a minute (rounded down), `30 seconds` below.
pub fn format_remaining(seconds: u64) -> String {
    if seconds >= 60 {
        unit(seconds / 60, "minute")
    } else {
        unit(seconds, "second")
    }
}

/// `2 minutes 5 seconds`, dropping a zero component.
pub fn format_duration_words(seconds: u64) -> String {
    let minutes = seconds / 60;
    let rest = seconds % 60;
    match (minutes, rest) {
        (0, s) => unit(s, "second"),
        (m, 0) => unit(m, "minute"),
        (m, s) => format!("{} {}", unit(m, "minute"), unit(s, "second")),
    }
}
