//! Cron and one-shot scheduling of reseed runs.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::JobConfig;

use super::runner::RunOrchestrator;
use super::types::OrchestratorError;

/// Delay before a one-shot run fires.
pub const RUN_ONCE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}

/// When runs fire.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Recurring, standard 5-field cron.
    Cron(Box<cron::Schedule>),
    /// A single run after the delay.
    Once(Duration),
}

impl Schedule {
    /// Parse a 5-field crontab expression (minute hour day month weekday).
    ///
    /// Numeric weekdays follow crontab: 0 and 7 are Sunday.
    pub fn cron(expr: &str) -> Result<Self, ScheduleError> {
        let expr = expr.trim();
        let invalid = |reason: String| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
        };
        let weekday = crontab_weekdays(weekday).map_err(invalid)?;
        let full = format!("0 {} {} {} {} {}", minute, hour, day, month, weekday);

        cron::Schedule::from_str(&full)
            .map(|s| Schedule::Cron(Box::new(s)))
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn run_once() -> Self {
        Schedule::Once(RUN_ONCE_DELAY)
    }

    /// Schedules to start for a job.
    ///
    /// Nothing when the job is disabled. Otherwise the cron schedule, preceded
    /// by a one-shot run when `run_once` is set.
    pub fn for_job(job: &JobConfig) -> Result<Vec<Self>, ScheduleError> {
        if !job.enabled {
            return Ok(Vec::new());
        }
        let mut schedules = Vec::with_capacity(2);
        if job.run_once {
            schedules.push(Self::run_once());
        }
        schedules.push(Self::cron(job.effective_cron())?);
        Ok(schedules)
    }

    /// Time until the next run, `None` when nothing is left to run.
    pub fn next_delay(&self) -> Option<Duration> {
        match self {
            Schedule::Once(delay) => Some(*delay),
            Schedule::Cron(schedule) => {
                let now = Local::now();
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

/// Rewrite a crontab weekday field (Sunday = 0 or 7) into the `cron` crate's
/// numbering (Sunday = 1 through Saturday = 7).
///
/// Wildcards and weekday names pass through unchanged. Numeric items are
/// expanded into an explicit list.
fn crontab_weekdays(field: &str) -> Result<String, String> {
    let mut items = Vec::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        if range == "*" || range == "?" || !range.starts_with(|c: char| c.is_ascii_digit()) {
            items.push(item.to_string());
            continue;
        }

        let parse = |value: &str| -> Result<u32, String> {
            match value.parse::<u32>() {
                Ok(day) if day <= 7 => Ok(day),
                _ => Err(format!("invalid weekday '{}'", value)),
            }
        };
        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None if step.is_some() => (parse(range)?, 6),
            None => {
                let day = parse(range)?;
                (day, day)
            }
        };
        let step = match step {
            Some(step) => step
                .parse::<usize>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| format!("invalid weekday step '{}'", step))?,
            None => 1,
        };
        if start > end {
            return Err(format!("invalid weekday range '{}'", range));
        }

        let mut days: Vec<u32> = (start..=end).step_by(step).map(|d| d % 7 + 1).collect();
        days.sort_unstable();
        days.dedup();
        items.extend(days.into_iter().map(|d| d.to_string()));
    }

    Ok(items.join(","))
}

/// Spawns the background task that triggers runs.
pub struct JobScheduler;

impl JobScheduler {
    /// Start triggering runs of `orchestrator` on `schedule`.
    pub fn start(orchestrator: Arc<RunOrchestrator>, schedule: Schedule) -> JobHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(async move {
            info!("Job scheduler started");
            loop {
                let Some(delay) = schedule.next_delay() else {
                    warn!("Cron schedule has no upcoming runs");
                    break;
                };
                info!(delay_secs = delay.as_secs(), "Next reseed run scheduled");

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Job scheduler received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        trigger(&orchestrator).await;
                    }
                }

                if matches!(schedule, Schedule::Once(_)) {
                    break;
                }
            }
            info!("Job scheduler stopped");
        });

        JobHandle { shutdown_tx, task }
    }
}

async fn trigger(orchestrator: &RunOrchestrator) {
    match orchestrator.run_all().await {
        Ok(summary) => info!(
            run_id = %summary.run_id,
            candidates = summary.candidates,
            success = summary.success,
            failed = summary.failed,
            "Scheduled run completed"
        ),
        Err(OrchestratorError::RunInProgress) => {
            warn!("Scheduled run skipped, previous run still in progress")
        }
        Err(e) => warn!(error = %e, "Scheduled run refused"),
    }
}

/// Handle to a running scheduler.
pub struct JobHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Stop scheduling future runs.
    ///
    /// A run already executing finishes before this returns.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Job scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
