mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};

use common::app::spawn_app;
use common::fixtures::{seed_answer, seed_quest};
use common::http::{assert_json_error, assert_status_ok_json, request, response_json};

#[tokio::test]
async fn it_analysis_reports_confusions_with_oracle_down() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &[]);
    let recent = Utc::now() - Duration::hours(1);
    seed_answer(&app.store, "u1", recent, "ㅂ", "ㅍ", false, &["ㅂ"]);
    seed_answer(
        &app.store,
        "u1",
        recent + Duration::minutes(1),
        "ㅂ",
        "ㅍ",
        false,
        &["ㅂ"],
    );
    seed_answer(
        &app.store,
        "u1",
        recent + Duration::minutes(2),
        "ㅏ",
        "ㅏ",
        true,
        &[],
    );

    let resp = request(&app.app, Method::GET, "/api/analysis/user/u1?days=7", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);

    let data = &body["data"];
    assert_eq!(data["userId"], "u1");
    assert_eq!(data["periodDays"], 7);
    assert_eq!(data["basicStats"]["totalAnswers"], 3);
    assert_eq!(data["basicStats"]["correctAnswers"], 1);
    assert_eq!(
        data["basicStats"]["confusionPatterns"][0]["pattern"],
        "ㅂ -> ㅍ"
    );
    assert_eq!(data["basicStats"]["confusionPatterns"][0]["count"], 2);
    // Oracle unreachable: the insight layer degrades to a notice.
    assert_eq!(
        data["aiInsights"]["message"],
        "AI analysis not available"
    );
}

#[tokio::test]
async fn it_analysis_defaults_and_clamps_days() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &[]);
    seed_answer(
        &app.store,
        "u1",
        Utc::now() - Duration::hours(1),
        "ㅏ",
        "ㅓ",
        false,
        &[],
    );

    let default_days = request(&app.app, Method::GET, "/api/analysis/user/u1", None).await;
    let (status, _, body) = response_json(default_days).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["periodDays"], 7);

    let clamped = request(
        &app.app,
        Method::GET,
        "/api/analysis/user/u1?days=5000",
        None,
    )
    .await;
    let (status, _, body) = response_json(clamped).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["periodDays"], 90);
}

#[tokio::test]
async fn it_analysis_without_answers_is_not_found() {
    let app = spawn_app().await;

    let resp = request(&app.app, Method::GET, "/api/analysis/user/ghost", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn it_accuracy_breaks_down_by_category() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &["vowels"]);
    let recent = Utc::now() - Duration::hours(1);
    seed_answer(&app.store, "u1", recent, "ㅏ", "ㅏ", true, &[]);
    seed_answer(&app.store, "u1", recent + Duration::minutes(1), "ㅓ", "ㅓ", true, &[]);
    seed_answer(&app.store, "u1", recent + Duration::minutes(2), "ㅗ", "ㅜ", false, &[]);

    let resp = request(
        &app.app,
        Method::GET,
        "/api/analysis/user/u1/accuracy?days=7",
        None,
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);

    let data = &body["data"];
    assert_eq!(data["totalQuestions"], 3);
    assert_eq!(data["correctAnswers"], 2);
    assert_eq!(data["accuracy"], 0.667);
    assert_eq!(data["categoryAccuracy"][0]["category"], "vowels");
    assert_eq!(data["categoryAccuracy"][0]["accuracy"], 0.667);
    assert!(data.get("message").is_none());
}

#[tokio::test]
async fn it_accuracy_without_answers_returns_zeros_not_an_error() {
    let app = spawn_app().await;

    let resp = request(
        &app.app,
        Method::GET,
        "/api/analysis/user/ghost/accuracy",
        None,
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);

    let data = &body["data"];
    assert_eq!(data["totalQuestions"], 0);
    assert_eq!(data["accuracy"], 0.0);
    assert_eq!(data["message"], "No answers found in the specified period");
}

#[tokio::test]
async fn it_report_composes_sections_with_oracle_down() {
    let app = spawn_app().await;
    seed_quest(&app.store, "q1", 1, &["vowels"]);
    let recent = Utc::now() - Duration::hours(1);
    for i in 0..4 {
        seed_answer(
            &app.store,
            "u1",
            recent + Duration::minutes(i),
            "ㅏ",
            "ㅏ",
            true,
            &[],
        );
    }
    seed_answer(&app.store, "u1", recent + Duration::minutes(5), "ㅂ", "ㅍ", false, &["ㅂ"]);

    let resp = request(&app.app, Method::GET, "/api/analysis/user/u1/report", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);

    let data = &body["data"];
    assert_eq!(data["userId"], "u1");
    assert_eq!(data["periodDays"], 30);
    assert_eq!(data["accuracy"]["totalQuestions"], 5);
    assert_eq!(data["accuracy"]["accuracy"], 0.8);

    // All activity is recent, so every trailing sub-period has data.
    let progress = data["progress"].as_array().unwrap();
    assert_eq!(progress.len(), 4);
    assert_eq!(progress[0]["periodDays"], 7);
    assert_eq!(progress[0]["totalQuestions"], 5);

    assert_eq!(data["performance"]["basicStats"]["totalAnswers"], 5);

    let strengths: Vec<&str> = data["strengths"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(strengths.contains(&"High overall accuracy"));
    assert!(strengths.contains(&"Strong in vowels"));
    assert_eq!(data["weaknesses"].as_array().unwrap().len(), 0);
    assert_eq!(
        data["recommendations"][0],
        "Practice distinguishing ㅂ -> ㅍ"
    );

    // Oracle unreachable: the AI layer degrades to an empty object.
    assert_eq!(data["aiRecommendations"], serde_json::json!({}));
}

#[tokio::test]
async fn it_report_without_answers_is_not_found() {
    let app = spawn_app().await;

    let resp = request(&app.app, Method::GET, "/api/analysis/user/ghost/report", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}
