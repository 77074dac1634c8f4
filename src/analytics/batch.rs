use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analytics::generate::FeedbackError;
use crate::analytics::stats::accuracy_percent;
use crate::analytics::{FeedbackPipeline, TimeWindow};
use crate::scheduler::JobKind;
use crate::store::operations::batch_jobs::{
    BatchJob, JOB_STATUS_COMPLETED, JOB_STATUS_FAILED,
};
use crate::store::StoreError;

/// Trailing window the weekly report and monthly summary aggregate over.
const REPORT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_SKIPPED: &str = "skipped";
pub const OUTCOME_ERROR: &str = "error";

/// Per-user result line inside a run report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOutcome {
    pub user_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What one batch run did. Also persisted as the job-history result blob.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRunReport {
    pub job_type: String,
    pub date: String,
    pub total_users: usize,
    pub processed_count: u32,
    pub error_count: u32,
    pub results: Vec<UserOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

impl FeedbackPipeline {
    pub async fn run(
        &self,
        kind: JobKind,
        target_date: Option<NaiveDate>,
    ) -> Result<BatchRunReport, BatchError> {
        match kind {
            JobKind::DailyFeedback => self.run_daily_feedback(target_date).await,
            JobKind::WeeklyReport => self.run_weekly_report().await,
            JobKind::MonthlySummary => self.run_monthly_summary().await,
        }
    }

    /// `run` plus job-history bookkeeping: a running row goes in before
    /// the work starts and is finalized as completed or failed. History
    /// write failures are logged, never allowed to sink the run itself.
    pub async fn run_recorded(
        &self,
        kind: JobKind,
        target_date: Option<NaiveDate>,
    ) -> Result<BatchRunReport, BatchError> {
        let mut job = BatchJob::start(kind.as_str());
        if let Err(error) = self.store.upsert_batch_job(&job) {
            warn!(%error, "Failed to record batch job start");
        }

        match self.run(kind, target_date).await {
            Ok(report) => {
                job.status = JOB_STATUS_COMPLETED.to_string();
                job.completed_at = Some(Utc::now());
                job.processed_count = report.processed_count;
                job.error_count = report.error_count;
                job.result = serde_json::to_value(&report).ok();
                if let Err(error) = self.store.upsert_batch_job(&job) {
                    warn!(%error, "Failed to record batch job completion");
                }
                Ok(report)
            }
            Err(batch_error) => {
                job.status = JOB_STATUS_FAILED.to_string();
                job.completed_at = Some(Utc::now());
                job.error_message = Some(batch_error.to_string());
                if let Err(error) = self.store.upsert_batch_job(&job) {
                    warn!(%error, "Failed to record batch job failure");
                }
                Err(batch_error)
            }
        }
    }

    /// Generate and persist daily feedback for every user active on the
    /// target day. Users are processed in fixed-size chunks concurrently,
    /// with a short pause between chunks to keep oracle load flat. One
    /// user failing never stops the run.
    pub async fn run_daily_feedback(
        &self,
        target_date: Option<NaiveDate>,
    ) -> Result<BatchRunReport, BatchError> {
        let date = target_date.unwrap_or_else(|| self.local_today());
        let window = TimeWindow::for_local_day(date, self.batch.tz_offset());
        info!(%date, "Starting daily feedback batch");

        let users = self.store.eligible_user_ids(window.start, window.end)?;
        info!(total_users = users.len(), "Found eligible users");

        let mut results = Vec::with_capacity(users.len());
        let mut processed_count = 0u32;
        let mut error_count = 0u32;

        let chunks: Vec<&[String]> = users.chunks(self.batch.batch_size).collect();
        let total_chunks = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let tasks = chunk.iter().map(|user_id| async move {
                let outcome = self.generate_for_user(user_id, date).await;
                (user_id.as_str(), outcome)
            });
            for (user_id, outcome) in futures::future::join_all(tasks).await {
                match outcome {
                    Ok(record) => {
                        processed_count += 1;
                        results.push(UserOutcome {
                            user_id: user_id.to_string(),
                            status: OUTCOME_SUCCESS.to_string(),
                            feedback_id: Some(record.id),
                            error: None,
                        });
                    }
                    Err(FeedbackError::NoData { .. }) => {
                        debug!(user_id, "No data in window, skipping");
                        results.push(UserOutcome {
                            user_id: user_id.to_string(),
                            status: OUTCOME_SKIPPED.to_string(),
                            feedback_id: None,
                            error: None,
                        });
                    }
                    Err(err) => {
                        error_count += 1;
                        error!(user_id, error = %err, "Feedback generation failed");
                        results.push(UserOutcome {
                            user_id: user_id.to_string(),
                            status: OUTCOME_ERROR.to_string(),
                            feedback_id: None,
                            error: Some(err.to_string()),
                        });
                    }
                }
            }
            if index + 1 < total_chunks {
                tokio::time::sleep(Duration::from_millis(self.batch.pause_ms)).await;
            }
        }

        info!(
            %date,
            total_users = users.len(),
            processed_count,
            error_count,
            "Daily feedback batch finished"
        );
        Ok(BatchRunReport {
            job_type: JobKind::DailyFeedback.as_str().to_string(),
            date: date.to_string(),
            total_users: users.len(),
            processed_count,
            error_count,
            results,
            summary: None,
        })
    }

    /// Trailing-30-day accuracy per active user, persisted through the
    /// job history rather than as user-facing feedback.
    pub async fn run_weekly_report(&self) -> Result<BatchRunReport, BatchError> {
        let window = TimeWindow::trailing_days(REPORT_WINDOW_DAYS);
        info!("Starting weekly report batch");

        let users = self.store.eligible_user_ids(window.start, window.end)?;
        let mut results = Vec::with_capacity(users.len());
        let mut processed_count = 0u32;
        let mut error_count = 0u32;
        let mut per_user = Vec::with_capacity(users.len());

        for user_id in &users {
            match self.store.attempts_in_window(user_id, window.start, window.end) {
                Ok(attempts) => {
                    let total: u32 = attempts.iter().map(|a| a.total_items).sum();
                    let correct: u32 = attempts.iter().map(|a| a.correct_items).sum();
                    per_user.push(json!({
                        "userId": user_id,
                        "attempts": attempts.len(),
                        "accuracy": accuracy_percent(correct, total),
                    }));
                    processed_count += 1;
                    results.push(UserOutcome {
                        user_id: user_id.clone(),
                        status: OUTCOME_SUCCESS.to_string(),
                        feedback_id: None,
                        error: None,
                    });
                }
                Err(err) => {
                    error_count += 1;
                    error!(user_id, error = %err, "Weekly aggregation failed");
                    results.push(UserOutcome {
                        user_id: user_id.clone(),
                        status: OUTCOME_ERROR.to_string(),
                        feedback_id: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        info!(total_users = users.len(), processed_count, "Weekly report batch finished");
        Ok(BatchRunReport {
            job_type: JobKind::WeeklyReport.as_str().to_string(),
            date: self.local_today().to_string(),
            total_users: users.len(),
            processed_count,
            error_count,
            results,
            summary: Some(json!({ "windowDays": REPORT_WINDOW_DAYS, "users": per_user })),
        })
    }

    /// System-wide answer statistics over the trailing 30 days, broken
    /// down by category tag.
    pub async fn run_monthly_summary(&self) -> Result<BatchRunReport, BatchError> {
        let window = TimeWindow::trailing_days(REPORT_WINDOW_DAYS);
        info!("Starting monthly summary batch");

        let answers = self.store.all_answers_in_window(window.start, window.end)?;
        let total = answers.len() as u32;
        let correct = answers.iter().filter(|a| a.is_correct).count() as u32;

        let mut active_users = std::collections::BTreeSet::new();
        let mut categories: std::collections::BTreeMap<String, (u32, u32)> =
            std::collections::BTreeMap::new();
        for answer in &answers {
            active_users.insert(answer.user_id.as_str());
            for tag in self.store.quest_tag_names(&answer.quest_id)? {
                let entry = categories.entry(tag).or_insert((0, 0));
                entry.0 += 1;
                if answer.is_correct {
                    entry.1 += 1;
                }
            }
        }
        let category_performance: Vec<serde_json::Value> = categories
            .into_iter()
            .map(|(name, (answered, right))| {
                json!({
                    "category": name,
                    "answers": answered,
                    "accuracy": accuracy_percent(right, answered),
                })
            })
            .collect();

        let summary = json!({
            "windowDays": REPORT_WINDOW_DAYS,
            "totalAnswers": total,
            "correctAnswers": correct,
            "accuracy": accuracy_percent(correct, total),
            "activeUsers": active_users.len(),
            "categoryPerformance": category_performance,
        });

        info!(total_answers = total, active_users = active_users.len(), "Monthly summary batch finished");
        Ok(BatchRunReport {
            job_type: JobKind::MonthlySummary.as_str().to_string(),
            date: self.local_today().to_string(),
            total_users: active_users.len(),
            processed_count: 1,
            error_count: 0,
            results: Vec::new(),
            summary: Some(summary),
        })
    }
}
