// ABOUTME: check-update, update, and install command implementations.
// ABOUTME: Offline variants of the keeper update workflows; Ctrl-C cancels a download.

use super::{cancel_on_ctrl_c, open_keeper};
use bedrock_keeper::error::Result;
use bedrock_keeper::keeper::UpdateAttempt;
use bedrock_keeper::output::Output;
use std::path::Path;
use std::sync::Arc;

pub async fn check_update(dir: &Path, output: Output) -> Result<()> {
    let keeper = open_keeper(dir)?;
    let check = keeper.check_for_update().await?;
    output.report(&check.summary(), &check);
    Ok(())
}

pub async fn update(dir: &Path, force: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let keeper = Arc::new(open_keeper(dir)?);

    output.progress("Checking for a newer release...");
    let watcher = cancel_on_ctrl_c(Arc::clone(&keeper));
    let attempt = keeper.update(false, force).await;
    watcher.abort();

    report_update(&output, &attempt?);
    Ok(())
}

pub async fn install(dir: &Path, mut output: Output) -> Result<()> {
    output.start_timer();
    let keeper = Arc::new(open_keeper(dir)?);
    if keeper.binary_exists() {
        output.success(&format!(
            "Server already installed in {}",
            keeper.paths().install_dir.display()
        ));
        return Ok(());
    }

    output.progress("Downloading the latest release...");
    let watcher = cancel_on_ctrl_c(Arc::clone(&keeper));
    let installed = keeper.install_latest().await;
    watcher.abort();

    let artifact = installed?;
    output.report(
        &format!(
            "Installed {} into {}",
            artifact.version,
            keeper.paths().install_dir.display()
        ),
        &artifact,
    );
    Ok(())
}

pub(super) fn report_update(output: &Output, attempt: &UpdateAttempt) {
    match attempt {
        UpdateAttempt::NotNeeded(check) => {
            if check.current.is_none() {
                output.progress("Pass --force to install the latest release anyway");
            }
            output.report(&check.summary(), check);
        }
        UpdateAttempt::Cancelled => output.success("Update cancelled"),
        UpdateAttempt::Installed(report) => {
            for warning in &report.warnings {
                output.warning(&warning.message);
            }
            output.report(&format!("Updated to {}", report.version), report);
        }
    }
}
