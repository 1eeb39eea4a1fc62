// ABOUTME: Entry point for the bedrock-keeper CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use bedrock_keeper::config;
use bedrock_keeper::error::Result;
use bedrock_keeper::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    // RUST_LOG wins over the verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else if mode == OutputMode::Normal {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli, Output::new(mode)).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let dir = cli.dir;
    match cli.command {
        Commands::Init { force } => {
            config::init_config(&dir, force)?;
            output.success(&format!(
                "Wrote {}",
                dir.join(config::CONFIG_FILENAME).display()
            ));
            Ok(())
        }
        Commands::Run {
            install,
            no_startup_backup,
        } => commands::run(&dir, install, !no_startup_backup, output).await,
        Commands::Backup => commands::backup(&dir, output).await,
        Commands::CheckUpdate => commands::check_update(&dir, output).await,
        Commands::Update { force } => commands::update(&dir, force, output).await,
        Commands::Install => commands::install(&dir, output).await,
        Commands::Status => commands::status(&dir, output),
    }
}
