// ABOUTME: Backup command implementation.
// ABOUTME: Archives the world of a stopped server into the manual backup folder.

use super::{megabytes, open_keeper};
use bedrock_keeper::backup::BackupKind;
use bedrock_keeper::error::Result;
use bedrock_keeper::keeper::BackupOutcome;
use bedrock_keeper::output::Output;
use std::path::Path;

pub async fn backup(dir: &Path, mut output: Output) -> Result<()> {
    output.start_timer();
    let keeper = open_keeper(dir)?;

    output.progress(&format!(
        "Backing up {}",
        keeper.paths().worlds_dir().display()
    ));
    let outcome = keeper.backup(BackupKind::Manual, false).await?;
    report_backup(&output, &outcome);
    Ok(())
}

pub(super) fn report_backup(output: &Output, outcome: &BackupOutcome) {
    match outcome {
        BackupOutcome::Completed(record) => {
            for evicted in &record.evicted {
                output.progress(&format!("Removed old backup {}", evicted.display()));
            }
            output.report(
                &format!(
                    "Backup written to {} ({})",
                    record.archive_path.display(),
                    megabytes(record.size_bytes)
                ),
                record,
            );
        }
        BackupOutcome::Cancelled => output.success("Backup cancelled"),
    }
}
