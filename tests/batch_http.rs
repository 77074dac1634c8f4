mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::spawn_app;
use common::fixtures::{fixture_date, fixture_instant, seed_attempt, seed_quest};
use common::http::{assert_json_error, assert_status_ok_json, request, response_json};

#[tokio::test]
async fn it_trigger_daily_batch_isolates_failures() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &[]);
    for user in ["u1", "u2", "u3"] {
        seed_attempt(&app.store, user, "q1", fixture_instant(9), 10, 8);
    }
    // u2's anchor row is corrupt: persistence for that user fails, the
    // other two must still complete.
    let key = analytics_backend::store::keys::day_anchor_key("u2", fixture_date());
    app.store
        .day_anchors
        .insert(key.as_bytes(), b"not json".as_slice())
        .unwrap();

    let resp = request(
        &app.app,
        Method::POST,
        "/api/batch/trigger/daily_feedback",
        Some(json!({ "targetDate": "2025-01-15" })),
    )
    .await;

    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);
    let report = &body["data"];
    assert_eq!(report["jobType"], "daily_feedback");
    assert_eq!(report["totalUsers"], 3);
    assert_eq!(report["processedCount"], 2);
    assert_eq!(report["errorCount"], 1);

    let failed: Vec<&str> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["status"] == "error")
        .map(|r| r["userId"].as_str().unwrap())
        .collect();
    assert_eq!(failed, vec!["u2"]);
}

#[tokio::test]
async fn it_trigger_records_job_history() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &[]);
    seed_attempt(&app.store, "u1", "q1", fixture_instant(9), 10, 8);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/batch/trigger/daily_feedback",
        Some(json!({ "targetDate": "2025-01-15" })),
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);

    let jobs = request(&app.app, Method::GET, "/api/batch/jobs", None).await;
    let (status, _, body) = response_json(jobs).await;
    assert_status_ok_json(status, &body);
    let jobs = body["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "completed");
    assert_eq!(jobs[0]["processedCount"], 1);
    assert!(jobs[0]["result"]["results"].is_array());

    let job_id = jobs[0]["id"].as_str().unwrap().to_string();
    let single = request(
        &app.app,
        Method::GET,
        &format!("/api/batch/jobs/{job_id}"),
        None,
    )
    .await;
    let (status, _, body) = response_json(single).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["id"], job_id.as_str());

    let summary = request(&app.app, Method::GET, "/api/batch/status", None).await;
    let (status, _, body) = response_json(summary).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["completed"], 1);
    assert_eq!(body["data"]["running"], 0);
    assert_eq!(body["data"]["failed"], 0);
}

#[tokio::test]
async fn it_unknown_job_type_is_rejected() {
    let app = spawn_app().await;

    let resp = request(
        &app.app,
        Method::POST,
        "/api/batch/trigger/nonsense",
        None,
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
}

#[tokio::test]
async fn it_unknown_job_id_is_not_found() {
    let app = spawn_app().await;

    let resp = request(&app.app, Method::GET, "/api/batch/jobs/nope", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn it_weekly_and_monthly_jobs_run_on_demand() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &["vowels"]);
    let recent = chrono::Utc::now() - chrono::Duration::hours(2);
    seed_attempt(&app.store, "u1", "q1", recent, 10, 8);
    common::fixtures::seed_answer(&app.store, "u1", recent, "ㅂ", "ㅍ", false, &[]);

    let weekly = request(
        &app.app,
        Method::POST,
        "/api/batch/trigger/weekly_report",
        None,
    )
    .await;
    let (status, _, body) = response_json(weekly).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["jobType"], "weekly_report");
    assert_eq!(body["data"]["processedCount"], 1);
    assert_eq!(body["data"]["summary"]["users"][0]["userId"], "u1");

    let monthly = request(
        &app.app,
        Method::POST,
        "/api/batch/trigger/monthly_summary",
        None,
    )
    .await;
    let (status, _, body) = response_json(monthly).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["jobType"], "monthly_summary");
    assert_eq!(body["data"]["summary"]["totalAnswers"], 1);
    assert_eq!(body["data"]["summary"]["activeUsers"], 1);
    assert_eq!(
        body["data"]["summary"]["categoryPerformance"][0]["category"],
        "vowels"
    );
}

#[tokio::test]
async fn it_scheduler_lifecycle_is_idempotent() {
    let app = spawn_app().await;

    let status_resp = request(&app.app, Method::GET, "/api/batch/scheduler/status", None).await;
    let (status, _, body) = response_json(status_resp).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "stopped");
    assert!(body["data"]["jobs"].as_array().unwrap().is_empty());

    let start = request(&app.app, Method::POST, "/api/batch/scheduler/start", None).await;
    let (status, _, body) = response_json(start).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "running");
    // Only the daily job is enabled in the test config.
    let jobs = body["data"]["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], "daily_feedback");
    assert!(jobs[0]["schedule"].as_str().unwrap().starts_with("daily at 22:00"));

    // Second start is a no-op, not an error.
    let again = request(&app.app, Method::POST, "/api/batch/scheduler/start", None).await;
    let (status, _, body) = response_json(again).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "running");

    let stop = request(&app.app, Method::POST, "/api/batch/scheduler/stop", None).await;
    let (status, _, body) = response_json(stop).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "stopped");

    // Second stop is equally harmless.
    let again = request(&app.app, Method::POST, "/api/batch/scheduler/stop", None).await;
    let (status, _, body) = response_json(again).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "stopped");
}
