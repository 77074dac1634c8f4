use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analytics::generate::FeedbackError;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::feedback::FeedbackRecord;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/user/:user_id/latest", get(latest))
        .route("/user/:user_id/date/:date", get(by_date))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    user_id: String,
    target_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackResponse {
    /// Null when generation succeeded but persistence failed; the
    /// content is still returned so the caller can show it.
    feedback_id: Option<String>,
    user_id: String,
    date: String,
    title: String,
    message: String,
    tags: Option<String>,
}

impl From<FeedbackRecord> for FeedbackResponse {
    fn from(record: FeedbackRecord) -> Self {
        Self {
            feedback_id: Some(record.id),
            user_id: record.user_id,
            date: record.date.to_string(),
            title: record.title,
            message: record.message,
            tags: record.tags,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::bad_request("VALIDATION_ERROR", "Invalid date format. Use YYYY-MM-DD")
    })
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "userId must not be empty",
        ));
    }
    let date = match &request.target_date {
        Some(raw) => parse_date(raw)?,
        None => state.pipeline().local_today(),
    };

    let generated = state
        .pipeline()
        .build_daily_content(&request.user_id, date)
        .await
        .map_err(|error| match error {
            FeedbackError::NoData { .. } => AppError::not_found(&format!(
                "No learning data found for user {} on {date}",
                request.user_id
            )),
            other => AppError::internal(&other.to_string()),
        })?;

    let response = match state
        .store()
        .save_feedback(&request.user_id, date, &generated.content)
    {
        Ok(record) => FeedbackResponse::from(record),
        Err(error) => {
            warn!(user_id = %request.user_id, %error, "Failed to persist feedback; returning generated content");
            FeedbackResponse {
                feedback_id: None,
                user_id: request.user_id.clone(),
                date: date.to_string(),
                title: generated.content.title,
                message: generated.content.message,
                tags: generated.content.tags,
            }
        }
    };
    Ok(ok(response))
}

async fn latest(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store()
        .latest_feedback(&user_id)?
        .ok_or_else(|| AppError::not_found(&format!("No feedback found for user {user_id}")))?;
    Ok(ok(FeedbackResponse::from(record)))
}

async fn by_date(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&date)?;
    let record = state.store().feedback_by_date(&user_id, date)?.ok_or_else(|| {
        AppError::not_found(&format!("No feedback found for user {user_id} on {date}"))
    })?;
    Ok(ok(FeedbackResponse::from(record)))
}
