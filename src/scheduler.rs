use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::analytics::batch::{BatchError, BatchRunReport};
use crate::analytics::FeedbackPipeline;
use crate::config::{BatchConfig, JobSchedule};

/// Hard cap on one scheduled run; a wedged run must not block the next
/// day's slot forever.
const JOB_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DailyFeedback,
    WeeklyReport,
    MonthlySummary,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyFeedback => "daily_feedback",
            Self::WeeklyReport => "weekly_report",
            Self::MonthlySummary => "monthly_summary",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily_feedback" => Some(Self::DailyFeedback),
            "weekly_report" => Some(Self::WeeklyReport),
            "monthly_summary" => Some(Self::MonthlySummary),
            _ => None,
        }
    }

    pub fn all() -> [JobKind; 3] {
        [Self::DailyFeedback, Self::WeeklyReport, Self::MonthlySummary]
    }
}

/// Six-field cron expression for a schedule, with the configured local
/// hour shifted into UTC (the scheduler itself runs on UTC).
pub fn cron_expr(schedule: &JobSchedule, tz_offset_hours: i8) -> String {
    let hour_utc =
        (i16::from(schedule.hour) - i16::from(tz_offset_hours)).rem_euclid(24);
    if let Some(day_of_week) = schedule.day_of_week {
        format!("0 {} {} * * {}", schedule.minute, hour_utc, day_of_week)
    } else if let Some(day_of_month) = schedule.day_of_month {
        format!("0 {} {} {} * *", schedule.minute, hour_utc, day_of_month)
    } else {
        format!("0 {} {} * * *", schedule.minute, hour_utc)
    }
}

/// Human-readable recurrence, in the configured local time.
pub fn describe(schedule: &JobSchedule, tz_offset_hours: i8) -> String {
    let at = format!(
        "{:02}:{:02} (UTC{:+03})",
        schedule.hour, schedule.minute, tz_offset_hours
    );
    if let Some(day_of_week) = schedule.day_of_week {
        let weekday = match day_of_week {
            0 => "Sunday",
            1 => "Monday",
            2 => "Tuesday",
            3 => "Wednesday",
            4 => "Thursday",
            5 => "Friday",
            _ => "Saturday",
        };
        format!("weekly on {weekday} at {at}")
    } else if let Some(day_of_month) = schedule.day_of_month {
        format!("monthly on day {day_of_month} at {at}")
    } else {
        format!("daily at {at}")
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler error: {0}")]
    Cron(String),
}

impl From<tokio_cron_scheduler::JobSchedulerError> for SchedulerError {
    fn from(error: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Cron(error.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: String,
    pub next_run: Option<DateTime<Utc>>,
    pub schedule: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub status: String,
    pub jobs: Vec<JobInfo>,
}

struct RunningScheduler {
    scheduler: JobScheduler,
    jobs: Vec<(JobKind, uuid::Uuid)>,
}

/// Lifecycle wrapper around the cron runtime. Start and stop are both
/// idempotent; manual triggers work whether or not it is running.
pub struct BatchScheduler {
    pipeline: Arc<FeedbackPipeline>,
    config: BatchConfig,
    inner: Mutex<Option<RunningScheduler>>,
}

impl BatchScheduler {
    pub fn new(pipeline: Arc<FeedbackPipeline>, config: BatchConfig) -> Self {
        Self {
            pipeline,
            config,
            inner: Mutex::new(None),
        }
    }

    fn schedule_for(&self, kind: JobKind) -> &JobSchedule {
        match kind {
            JobKind::DailyFeedback => &self.config.daily_feedback,
            JobKind::WeeklyReport => &self.config.weekly_report,
            JobKind::MonthlySummary => &self.config.monthly_summary,
        }
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            warn!("Scheduler already running; start is a no-op");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;
        let mut jobs = Vec::new();
        for kind in JobKind::all() {
            let schedule = self.schedule_for(kind);
            if !schedule.enabled {
                info!(job = kind.as_str(), "Job disabled, not registering");
                continue;
            }
            let expr = cron_expr(schedule, self.config.tz_offset_hours);
            let id = add_job(&scheduler, &expr, kind, self.pipeline.clone()).await?;
            info!(job = kind.as_str(), cron = %expr, "Registered scheduled job");
            jobs.push((kind, id));
        }
        scheduler.start().await?;
        *guard = Some(RunningScheduler { scheduler, jobs });
        info!("Batch scheduler started");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(mut running) => {
                if let Err(error) = running.scheduler.shutdown().await {
                    warn!(%error, "Scheduler shutdown reported an error");
                }
                info!("Batch scheduler stopped");
            }
            None => warn!("Scheduler already stopped; stop is a no-op"),
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        let mut guard = self.inner.lock().await;
        let Some(running) = guard.as_mut() else {
            return SchedulerStatus {
                status: "stopped".to_string(),
                jobs: Vec::new(),
            };
        };

        let mut jobs = Vec::new();
        for (kind, id) in running.jobs.clone() {
            let next_run = running
                .scheduler
                .next_tick_for_job(id)
                .await
                .ok()
                .flatten();
            jobs.push(JobInfo {
                id: kind.as_str().to_string(),
                next_run,
                schedule: describe(self.schedule_for(kind), self.config.tz_offset_hours),
            });
        }
        SchedulerStatus {
            status: "running".to_string(),
            jobs,
        }
    }

    /// Run a job immediately, independent of the cron state.
    pub async fn trigger(
        &self,
        kind: JobKind,
        target_date: Option<NaiveDate>,
    ) -> Result<BatchRunReport, BatchError> {
        info!(job = kind.as_str(), "Manual batch trigger");
        self.pipeline.run_recorded(kind, target_date).await
    }
}

/// Register one cron job. An AtomicBool guards against overlapping runs
/// when an execution outlasts its interval.
async fn add_job(
    scheduler: &JobScheduler,
    cron: &str,
    kind: JobKind,
    pipeline: Arc<FeedbackPipeline>,
) -> Result<uuid::Uuid, SchedulerError> {
    let in_flight = Arc::new(AtomicBool::new(false));
    let job = Job::new_async(cron, move |_id, _lock| {
        let in_flight = in_flight.clone();
        let pipeline = pipeline.clone();
        Box::pin(async move {
            if in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                warn!(job = kind.as_str(), "Previous run still in flight, skipping");
                return;
            }
            match tokio::time::timeout(JOB_TIMEOUT, pipeline.run_recorded(kind, None)).await {
                Ok(Ok(report)) => info!(
                    job = kind.as_str(),
                    processed = report.processed_count,
                    errors = report.error_count,
                    "Scheduled job completed"
                ),
                Ok(Err(error)) => error!(job = kind.as_str(), %error, "Scheduled job failed"),
                Err(_) => error!(job = kind.as_str(), "Scheduled job timed out"),
            }
            in_flight.store(false, Ordering::SeqCst);
        })
    })?;
    Ok(scheduler.add(job).await?)
}
