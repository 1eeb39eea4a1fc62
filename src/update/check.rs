// ABOUTME: Compares the newest published release against the running server version.
// ABOUTME: An unknown running version is reported as such, never as an available update.

use std::cmp::Ordering;

use serde::Serialize;

use super::error::UpdateError;
use super::feed::{ReleaseFeed, ReleaseInfo};
use crate::types::{ServerVersion, compare_versions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Newer,
    UpToDate,
    /// No version line has been seen from the server yet.
    UnknownCurrent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    pub current: Option<ServerVersion>,
    pub latest: ReleaseInfo,
    pub status: UpdateStatus,
}

impl UpdateCheck {
    pub fn evaluate(current: Option<ServerVersion>, latest: ReleaseInfo) -> Self {
        let status = match current {
            None => UpdateStatus::UnknownCurrent,
            Some(current) => match compare_versions(&latest.version, &current.to_string()) {
                Ordering::Greater => UpdateStatus::Newer,
                Ordering::Equal | Ordering::Less => UpdateStatus::UpToDate,
            },
        };
        Self {
            current,
            latest,
            status,
        }
    }

    pub fn is_newer(&self) -> bool {
        self.status == UpdateStatus::Newer
    }

    pub fn summary(&self) -> String {
        match (self.status, self.current) {
            (UpdateStatus::Newer, Some(current)) => format!(
                "update available: {} -> {}",
                current, self.latest.version
            ),
            (UpdateStatus::UpToDate, Some(current)) => {
                format!("server is up to date ({})", current)
            }
            _ => format!(
                "latest release is {}; running version not yet known",
                self.latest.version
            ),
        }
    }
}

pub async fn check_for_update(
    feed: &dyn ReleaseFeed,
    current: Option<ServerVersion>,
) -> Result<UpdateCheck, UpdateError> {
    let latest = feed.latest_release().await?;
    let check = UpdateCheck::evaluate(current, latest);
    tracing::info!("{}", check.summary());
    Ok(check)
}
