// ABOUTME: Status command implementation.
// ABOUTME: Prints install, version, backup, and storage information.

use super::open_keeper;
use bedrock_keeper::error::Result;
use bedrock_keeper::output::{Output, OutputMode};
use std::path::Path;

pub fn status(dir: &Path, output: Output) -> Result<()> {
    let keeper = open_keeper(dir)?;
    let status = keeper.status();
    match output.mode() {
        OutputMode::Json => output.record(&status),
        OutputMode::Normal | OutputMode::Quiet => print!("{status}"),
    }
    Ok(())
}
