use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use analytics_backend::analytics::growth::GrowthStageConfig;
use analytics_backend::analytics::prompt::PromptLibrary;
use analytics_backend::analytics::FeedbackPipeline;
use analytics_backend::config::{BatchConfig, Config, JobSchedule, OracleConfig};
use analytics_backend::routes::build_router;
use analytics_backend::scheduler::BatchScheduler;
use analytics_backend::services::oracle::OracleClient;
use analytics_backend::state::AppState;
use analytics_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<Store>,
    pub pipeline: Arc<FeedbackPipeline>,
    _temp_dir: TempDir,
}

/// Config is built directly instead of through env vars so parallel
/// tests never race on the process environment. The oracle points at an
/// unroutable port with a one-second timeout: every generation falls
/// back deterministically and health checks report unavailable.
fn test_config(sled_path: String, prompts_path: String) -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        prompts_path,
        oracle: OracleConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "gemma".to_string(),
            timeout_secs: 1,
            health_timeout_secs: 1,
        },
        batch: BatchConfig {
            // UTC windows keep fixture timestamps easy to reason about.
            tz_offset_hours: 0,
            batch_size: 2,
            pause_ms: 0,
            autostart: false,
            daily_feedback: JobSchedule {
                enabled: true,
                hour: 22,
                minute: 0,
                day_of_week: None,
                day_of_month: None,
            },
            weekly_report: JobSchedule {
                enabled: false,
                hour: 1,
                minute: 0,
                day_of_week: Some(0),
                day_of_month: None,
            },
            monthly_summary: JobSchedule {
                enabled: false,
                hour: 2,
                minute: 0,
                day_of_week: None,
                day_of_month: Some(1),
            },
        },
        growth: GrowthStageConfig::default(),
    }
}

pub async fn spawn_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("analytics-test.sled");
    // Nonexistent path: the built-in prompt templates apply.
    let prompts_path = temp_dir.path().join("no-prompts.toml");
    let config = test_config(
        sled_path.to_string_lossy().to_string(),
        prompts_path.to_string_lossy().to_string(),
    );

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    let oracle = Arc::new(OracleClient::new(&config.oracle));
    let prompts = Arc::new(PromptLibrary::load(&config.prompts_path));
    let pipeline = Arc::new(FeedbackPipeline::new(
        store.clone(),
        oracle.clone(),
        prompts,
        config.growth.clone(),
        config.batch.clone(),
    ));
    let scheduler = Arc::new(BatchScheduler::new(pipeline.clone(), config.batch.clone()));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(
        store.clone(),
        oracle,
        pipeline.clone(),
        scheduler,
        &config,
        shutdown_tx,
    );

    TestApp {
        app: build_router(state.clone()),
        state,
        store,
        pipeline,
        _temp_dir: temp_dir,
    }
}
