// ABOUTME: Diagnostics accumulator for non-fatal warnings during a workflow.
// ABOUTME: Collects warnings that shouldn't fail a backup or update but belong in its report.

use serde::Serialize;

/// Collects non-fatal warnings during backup and update workflows.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Server settings could not be copied before an install swap.
    pub fn settings_snapshot(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SettingsSnapshot,
            message: message.into(),
        }
    }

    /// A downloaded archive or partial file was left behind.
    pub fn temp_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TempCleanup,
            message: message.into(),
        }
    }

    /// The updated server did not report in as expected.
    pub fn relaunch(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Relaunch,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Failed to snapshot `server.properties` and the permission lists.
    SettingsSnapshot,
    /// Failed to delete a temporary download.
    TempCleanup,
    /// Server restart after a swap needs attention.
    Relaunch,
}
