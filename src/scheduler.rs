// ABOUTME: One-hertz tick that fires scheduled backups and update checks when due.
// ABOUTME: Holds no domain logic; skips a run when another operation holds the lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::backup::BackupKind;
use crate::config::{Cadence, Config};
use crate::keeper::{BackupOutcome, Keeper, UpdateAttempt};
use crate::notify::CancelFlag;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledJob {
    Backup,
    UpdateCheck,
}

/// Next due times for each enabled job. Backups and update checks are
/// tracked independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub next_backup: Option<NaiveDateTime>,
    pub next_update_check: Option<NaiveDateTime>,
    pub last_update_check: Option<NaiveDateTime>,
    backup_cadence: Option<Cadence>,
    update_cadence: Option<Cadence>,
}

impl Schedule {
    pub fn from_config(config: &Config, now: NaiveDateTime) -> Self {
        let backup_cadence = config
            .backup
            .enabled
            .then(|| config.backup.cadence.clone());
        let update_cadence = config
            .update
            .enabled
            .then(|| config.update.cadence.clone());
        Self {
            next_backup: backup_cadence.as_ref().and_then(|c| c.next_after(now)),
            next_update_check: update_cadence.as_ref().and_then(|c| c.next_after(now)),
            last_update_check: None,
            backup_cadence,
            update_cadence,
        }
    }

    /// Jobs due at `now`, advancing each one's next due time past `now`.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<ScheduledJob> {
        let mut jobs = Vec::new();
        if let Some(next) = self.next_backup
            && next <= now
        {
            jobs.push(ScheduledJob::Backup);
            self.next_backup = self.backup_cadence.as_ref().and_then(|c| c.next_after(now));
        }
        if let Some(next) = self.next_update_check
            && next <= now
        {
            jobs.push(ScheduledJob::UpdateCheck);
            self.last_update_check = Some(now);
            self.next_update_check = self.update_cadence.as_ref().and_then(|c| c.next_after(now));
        }
        jobs
    }
}

pub struct Scheduler {
    keeper: Arc<Keeper>,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(keeper: Arc<Keeper>) -> Self {
        let now = chrono::Local::now().naive_local();
        let schedule = Schedule::from_config(keeper.config(), now);
        if let Some(next) = schedule.next_backup {
            tracing::info!("next automatic backup at {}", next);
        }
        if let Some(next) = schedule.next_update_check {
            tracing::info!("next update check at {}", next);
        }
        Self { keeper, schedule }
    }

    /// Tick until `stop` is raised.
    pub async fn run(mut self, stop: CancelFlag) {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        while !stop.is_cancelled() {
            interval.tick().await;
            self.keeper.expire_restart_grace();

            let now = chrono::Local::now().naive_local();
            for job in self.schedule.due(now) {
                self.fire(job);
            }
        }
        tracing::debug!("scheduler stopped");
    }

    fn fire(&self, job: ScheduledJob) {
        if let Some(holder) = self.keeper.lock().holder() {
            tracing::info!(
                "skipping scheduled {:?}: {} operation in progress",
                job,
                holder.kind
            );
            return;
        }

        let keeper = Arc::clone(&self.keeper);
        match job {
            ScheduledJob::Backup => {
                tokio::spawn(async move { run_scheduled_backup(&keeper).await });
            }
            ScheduledJob::UpdateCheck => {
                tokio::spawn(async move { run_scheduled_update(&keeper).await });
            }
        }
    }
}

async fn run_scheduled_backup(keeper: &Keeper) {
    match keeper.backup(BackupKind::Auto, true).await {
        Ok(BackupOutcome::Completed(record)) => {
            tracing::info!(
                "scheduled backup written to {}",
                record.archive_path.display()
            );
        }
        Ok(BackupOutcome::Cancelled) => tracing::info!("scheduled backup cancelled"),
        Err(e) if e.is_informational() => tracing::info!("scheduled backup skipped: {}", e),
        Err(e) => tracing::error!("scheduled backup failed: {}", e),
    }
}

async fn run_scheduled_update(keeper: &Keeper) {
    match keeper.update(true, false).await {
        Ok(UpdateAttempt::NotNeeded(check)) => tracing::info!("{}", check.summary()),
        Ok(UpdateAttempt::Cancelled) => tracing::info!("scheduled update cancelled"),
        Ok(UpdateAttempt::Installed(report)) => {
            tracing::info!("scheduled update installed {}", report.version);
        }
        Err(e) if e.is_informational() => tracing::info!("scheduled update skipped: {}", e),
        Err(e) => tracing::error!("scheduled update failed: {}", e),
    }
}
