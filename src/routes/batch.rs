use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::response::{ok, AppError};
use crate::scheduler::JobKind;
use crate::state::AppState;
use crate::store::operations::batch_jobs::{
    JOB_STATUS_COMPLETED, JOB_STATUS_FAILED, JOB_STATUS_RUNNING,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trigger/:job_type", post(trigger))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/status", get(batch_status))
        .route("/scheduler/start", post(scheduler_start))
        .route("/scheduler/stop", post(scheduler_stop))
        .route("/scheduler/status", get(scheduler_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    target_date: Option<String>,
}

fn parse_job_kind(raw: &str) -> Result<JobKind, AppError> {
    JobKind::parse(raw).ok_or_else(|| {
        AppError::bad_request(
            "VALIDATION_ERROR",
            &format!(
                "Unknown job type '{raw}'. Valid types: daily_feedback, weekly_report, monthly_summary"
            ),
        )
    })
}

/// Manual run, independent of whether the cron scheduler is running.
async fn trigger(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
    body: Option<Json<TriggerRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_job_kind(&job_type)?;
    let target_date = match body.and_then(|Json(req)| req.target_date) {
        Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            AppError::bad_request("VALIDATION_ERROR", "Invalid date format. Use YYYY-MM-DD")
        })?),
        None => None,
    };

    let report = state
        .scheduler()
        .trigger(kind, target_date)
        .await
        .map_err(|error| AppError::internal(&error.to_string()))?;
    Ok(ok(report))
}

#[derive(Debug, Deserialize)]
struct JobListParams {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0);
    let jobs = state.store().list_batch_jobs(limit, offset)?;
    Ok(ok(jobs))
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .store()
        .get_batch_job(&job_id)?
        .ok_or_else(|| AppError::not_found(&format!("Batch job '{job_id}' not found")))?;
    Ok(ok(job))
}

/// Counts by status plus the most recent history entries.
async fn batch_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let running = state.store().count_batch_jobs_by_status(JOB_STATUS_RUNNING)?;
    let completed = state
        .store()
        .count_batch_jobs_by_status(JOB_STATUS_COMPLETED)?;
    let failed = state.store().count_batch_jobs_by_status(JOB_STATUS_FAILED)?;
    let recent = state.store().list_batch_jobs(10, 0)?;
    Ok(ok(json!({
        "running": running,
        "completed": completed,
        "failed": failed,
        "recentJobs": recent,
    })))
}

async fn scheduler_start(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state
        .scheduler()
        .start()
        .await
        .map_err(|error| AppError::internal(&error.to_string()))?;
    Ok(ok(state.scheduler().status().await))
}

async fn scheduler_stop(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.scheduler().stop().await;
    Ok(ok(state.scheduler().status().await))
}

async fn scheduler_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.scheduler().status().await))
}
