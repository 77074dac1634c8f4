use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

/// Overall health including the oracle probe. The service itself is
/// healthy even when the oracle is down; generation just falls back.
pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let oracle_available = state.oracle().health_check().await;
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "oracle": {
            "available": oracle_available,
            "model": state.config().oracle.model,
        },
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    // Ready once the store answers a read.
    match state.store().get_day_anchor("__health__", chrono::NaiveDate::MIN) {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
