// ABOUTME: Application-wide error types for bedrock-keeper.
// ABOUTME: Uses thiserror to wrap the per-area errors behind one Result alias.

use std::path::PathBuf;
use thiserror::Error;

use crate::backup::BackupError;
use crate::lock::LockError;
use crate::process::ProcessError;
use crate::update::UpdateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown difficulty '{0}' (expected peaceful, easy, normal, or hard)")]
    InvalidDifficulty(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Expected conditions that are reported, not treated as failures.
    pub fn is_informational(&self) -> bool {
        match self {
            Error::Process(e) => e.is_informational(),
            Error::Backup(e) => e.is_informational(),
            Error::Update(e) => e.is_informational(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
