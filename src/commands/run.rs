// ABOUTME: Foreground supervision: launches the server, runs the scheduler, and reads stdin.
// ABOUTME: `!`-prefixed lines are keeper commands; anything else goes to the server console.

use super::backup::report_backup;
use super::open_keeper;
use super::update::report_update;
use bedrock_keeper::backup::BackupKind;
use bedrock_keeper::error::{Error, Result};
use bedrock_keeper::events::KeeperEvent;
use bedrock_keeper::keeper::{Difficulty, Keeper, RestartOutcome};
use bedrock_keeper::notify::CancelFlag;
use bedrock_keeper::output::{Output, OutputMode};
use bedrock_keeper::process::{ProcessError, StopOutcome};
use bedrock_keeper::scheduler::Scheduler;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

const HELP: &str = "keeper commands: !backup !update !force-update !cancel !restart !stop !start \
!status !difficulty <peaceful|easy|normal|hard> !quit; other lines go to the server console";

/// A line typed at the keeper's terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeeperCommand {
    Backup,
    Update { force: bool },
    Cancel,
    Restart,
    Stop,
    Start,
    Status,
    Difficulty(Difficulty),
    Help,
    Quit,
    /// Sent to the server console unchanged.
    Passthrough(String),
}

impl FromStr for KeeperCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let Some(rest) = line.strip_prefix('!') else {
            return Ok(KeeperCommand::Passthrough(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let command = match words.next().unwrap_or_default() {
            "backup" => KeeperCommand::Backup,
            "update" => KeeperCommand::Update { force: false },
            "force-update" => KeeperCommand::Update { force: true },
            "cancel" => KeeperCommand::Cancel,
            "restart" => KeeperCommand::Restart,
            "stop" => KeeperCommand::Stop,
            "start" => KeeperCommand::Start,
            "status" => KeeperCommand::Status,
            "difficulty" => {
                let value = words
                    .next()
                    .ok_or_else(|| "usage: !difficulty <value>".to_string())?;
                KeeperCommand::Difficulty(value.parse().map_err(|e: Error| e.to_string())?)
            }
            "help" => KeeperCommand::Help,
            "quit" | "exit" => KeeperCommand::Quit,
            other => return Err(format!("unknown keeper command '!{other}' (try !help)")),
        };
        Ok(command)
    }
}

/// Supervise the server until Ctrl-C or `!quit`, then stop it.
pub async fn run(dir: &Path, install: bool, startup_backup: bool, output: Output) -> Result<()> {
    let keeper = Arc::new(open_keeper(dir)?);
    let mode = output.mode();

    if !keeper.binary_exists() {
        if !install {
            let binary = keeper
                .paths()
                .install_dir
                .join(&keeper.config().server.binary);
            return Err(ProcessError::BinaryMissing(binary).into());
        }
        output.progress("No server installed, downloading the latest release...");
        let artifact = keeper.install_latest().await?;
        output.progress(&format!("Installed {}", artifact.version));
    }

    if startup_backup && let Some(record) = keeper.startup_backup_if_due().await? {
        output.progress(&format!(
            "Startup backup written to {}",
            record.archive_path.display()
        ));
    }

    // Normal mode sees everything through the log
    let printer = (mode != OutputMode::Normal)
        .then(|| tokio::spawn(print_events(keeper.subscribe(), mode)));

    keeper.start().await?;
    let stop = CancelFlag::new();
    let scheduler = tokio::spawn(Scheduler::new(Arc::clone(&keeper)).run(stop.clone()));
    output.progress(HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if dispatch(&keeper, line.trim(), mode) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, waiting for Ctrl-C");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::error!("failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    output.progress("Shutting down...");
    stop.cancel();
    if let Err(e) = scheduler.await {
        tracing::warn!("scheduler task ended abnormally: {}", e);
    }
    // Waits out any swap in progress before the runtime goes away
    let result = keeper.shutdown().await;
    if let Some(printer) = printer {
        printer.abort();
    }
    result?;
    output.success("Server stopped");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn dispatch(keeper: &Arc<Keeper>, line: &str, mode: OutputMode) -> Flow {
    if line.is_empty() {
        return Flow::Continue;
    }
    let output = Output::new(mode);
    let command = match line.parse::<KeeperCommand>() {
        Ok(command) => command,
        Err(message) => {
            output.warning(&message);
            return Flow::Continue;
        }
    };

    match command {
        KeeperCommand::Quit => return Flow::Quit,
        KeeperCommand::Help => output.progress(HELP),
        KeeperCommand::Cancel => {
            if !keeper.cancel() {
                output.warning("nothing to cancel");
            }
        }
        KeeperCommand::Status => {
            let status = keeper.status();
            match mode {
                OutputMode::Json => output.record(&status),
                OutputMode::Normal | OutputMode::Quiet => print!("{status}"),
            }
        }
        command => {
            let keeper = Arc::clone(keeper);
            tokio::spawn(async move {
                if let Err(e) = perform(&keeper, command, &output).await {
                    if e.is_informational() {
                        output.warning(&e.to_string());
                    } else {
                        output.error(&e.to_string());
                    }
                }
            });
        }
    }
    Flow::Continue
}

async fn perform(keeper: &Keeper, command: KeeperCommand, output: &Output) -> Result<()> {
    match command {
        KeeperCommand::Backup => {
            let outcome = keeper.backup(BackupKind::Manual, true).await?;
            report_backup(output, &outcome);
        }
        KeeperCommand::Update { force } => {
            let attempt = keeper.update(true, force).await?;
            report_update(output, &attempt);
        }
        KeeperCommand::Restart => match keeper.restart(true).await? {
            RestartOutcome::Restarted => output.success("Server restarted"),
            RestartOutcome::Cancelled => output.success("Restart cancelled"),
        },
        KeeperCommand::Stop => {
            match keeper.stop().await? {
                StopOutcome::Graceful => output.success("Server stopped"),
                StopOutcome::Forced => output.success("Server killed after stop timeout"),
            }
        }
        KeeperCommand::Start => {
            keeper.start().await?;
            output.success("Server started");
        }
        KeeperCommand::Difficulty(difficulty) => {
            keeper.change_difficulty(difficulty).await?;
            output.success(&format!("Difficulty set to {difficulty}"));
        }
        KeeperCommand::Passthrough(line) => keeper.send_command(&line).await?,
        KeeperCommand::Cancel
        | KeeperCommand::Status
        | KeeperCommand::Help
        | KeeperCommand::Quit => {}
    }
    Ok(())
}

/// Mirror keeper events to stdout: console lines in quiet mode, every event as JSON.
async fn print_events(mut events: broadcast::Receiver<KeeperEvent>, mode: OutputMode) {
    let output = Output::new(mode);
    loop {
        match events.recv().await {
            Ok(event) => match (&event, mode) {
                (_, OutputMode::Json) => output.record(&event),
                (KeeperEvent::ConsoleLine { line }, OutputMode::Quiet) => println!("{line}"),
                _ => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("event printer fell behind, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_pass_through() {
        assert_eq!(
            "say hello".parse::<KeeperCommand>().unwrap(),
            KeeperCommand::Passthrough("say hello".to_string())
        );
    }

    #[test]
    fn bang_commands_parse() {
        assert_eq!("!backup".parse::<KeeperCommand>().unwrap(), KeeperCommand::Backup);
        assert_eq!(
            "!force-update".parse::<KeeperCommand>().unwrap(),
            KeeperCommand::Update { force: true }
        );
        assert_eq!(
            "!difficulty hard".parse::<KeeperCommand>().unwrap(),
            KeeperCommand::Difficulty(Difficulty::Hard)
        );
        assert_eq!("!exit".parse::<KeeperCommand>().unwrap(), KeeperCommand::Quit);
    }

    #[test]
    fn bad_bang_commands_are_rejected() {
        assert!("!difficulty".parse::<KeeperCommand>().is_err());
        assert!("!difficulty nightmare".parse::<KeeperCommand>().is_err());
        assert!("!teleport".parse::<KeeperCommand>().is_err());
    }
}
