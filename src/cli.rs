// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bedrock-keeper")]
#[command(about = "Supervisor for a Bedrock dedicated server: backups, updates, and restarts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base directory holding keeper.yml, server_files/, and backup/
    #[arg(short, long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a commented keeper.yml into the base directory
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Supervise the server in the foreground, reading console commands from stdin
    Run {
        /// Download and unpack the latest release first if no server is installed
        #[arg(long)]
        install: bool,

        /// Skip the overdue automatic backup before launch
        #[arg(long)]
        no_startup_backup: bool,
    },

    /// Archive the world while the server is stopped
    Backup,

    /// Compare the running version against the latest published release
    CheckUpdate,

    /// Download and install the latest release, rolling back on failure
    Update {
        /// Install even when the latest release is not newer
        #[arg(short, long)]
        force: bool,
    },

    /// Install the latest release into an empty server directory
    Install,

    /// Show install, backup, and storage status
    Status,
}
