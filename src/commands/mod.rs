// ABOUTME: Command module aggregator for the bedrock-keeper CLI.
// ABOUTME: Re-exports the run, backup, update, and status command handlers.

mod backup;
mod run;
mod status;
mod update;

pub use backup::backup;
pub use run::run;
pub use status::status;
pub use update::{check_update, install, update};

use bedrock_keeper::config::{Config, KeeperPaths};
use bedrock_keeper::error::Result;
use bedrock_keeper::keeper::Keeper;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Load the config for `dir`, create the working directories, and build a keeper.
fn open_keeper(dir: &Path) -> Result<Keeper> {
    let config = Config::discover_or_default(dir)?;
    let paths = KeeperPaths::new(dir);
    paths.ensure_dirs()?;
    Keeper::new(config, paths)
}

/// Cancel the keeper's active countdown or download on Ctrl-C.
fn cancel_on_ctrl_c(keeper: Arc<Keeper>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            keeper.cancel();
        }
    })
}

fn megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}
