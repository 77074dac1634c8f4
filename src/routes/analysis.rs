use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::analytics::report::accuracy_summary;
use crate::analytics::TimeWindow;
use crate::response::{ok, AppError};
use crate::state::AppState;

const DEFAULT_DAYS: u32 = 7;
const MAX_DAYS: u32 = 90;
const DEFAULT_REPORT_DAYS: u32 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/:user_id", get(analyze_user))
        .route("/user/:user_id/accuracy", get(user_accuracy))
        .route("/user/:user_id/report", get(user_report))
}

#[derive(Debug, Deserialize)]
struct AnalysisParams {
    days: Option<u32>,
}

async fn analyze_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let report = state
        .pipeline()
        .analyze_user_performance(&user_id, days)
        .await?
        .ok_or_else(|| {
            AppError::not_found(&format!(
                "No answer data found for user {user_id} in the last {days} days"
            ))
        })?;
    Ok(ok(report))
}

/// Overall and per-category accuracy over the trailing window. Always
/// 200; an empty window comes back as zeros with a message.
async fn user_accuracy(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let window = TimeWindow::trailing_days(days);
    let summary = accuracy_summary(state.store(), &user_id, window)?;
    Ok(ok(summary))
}

async fn user_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days.unwrap_or(DEFAULT_REPORT_DAYS).clamp(1, MAX_DAYS);
    let report = state
        .pipeline()
        .comprehensive_report(&user_id, days)
        .await?
        .ok_or_else(|| {
            AppError::not_found(&format!(
                "No answer data found for user {user_id} in the last {days} days"
            ))
        })?;
    Ok(ok(report))
}
