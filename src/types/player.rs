// ABOUTME: Validated player identity types parsed from console output.
// ABOUTME: PlayerName is the gamertag, Xuid the stable numeric account id.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerIdError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("xuid cannot be empty")]
    EmptyXuid,

    #[error("xuid must be numeric: '{0}'")]
    NonNumericXuid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(value: &str) -> Result<Self, PlayerIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlayerIdError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Xuid(String);

impl Xuid {
    pub fn new(value: &str) -> Result<Self, PlayerIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlayerIdError::EmptyXuid);
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(PlayerIdError::NonNumericXuid(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Xuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
