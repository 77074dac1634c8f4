use std::net::SocketAddr;
use std::sync::Arc;

use analytics_backend::analytics::prompt::PromptLibrary;
use analytics_backend::analytics::FeedbackPipeline;
use analytics_backend::config::Config;
use analytics_backend::logging::{init_tracing, LogConfig};
use analytics_backend::routes::build_router;
use analytics_backend::scheduler::BatchScheduler;
use analytics_backend::services::oracle::OracleClient;
use analytics_backend::state::AppState;
use analytics_backend::store::Store;
use axum::http::header;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    });
    tracing::info!("Starting analytics-backend");

    let store = Arc::new(Store::open(&config.sled_path).expect("Failed to open sled database"));
    let oracle = Arc::new(OracleClient::new(&config.oracle));
    let prompts = Arc::new(PromptLibrary::load(&config.prompts_path));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let pipeline = Arc::new(FeedbackPipeline::new(
        store.clone(),
        oracle.clone(),
        prompts,
        config.growth.clone(),
        config.batch.clone(),
    ));
    let scheduler = Arc::new(BatchScheduler::new(pipeline.clone(), config.batch.clone()));

    if config.batch.autostart {
        if let Err(e) = scheduler.start().await {
            tracing::error!(error = %e, "Failed to start batch scheduler");
        }
    } else {
        tracing::info!("Scheduler autostart disabled; start it via /api/batch/scheduler/start");
    }

    let state = AppState::new(
        store.clone(),
        oracle,
        pipeline,
        scheduler.clone(),
        &config,
        shutdown_tx.clone(),
    );

    let app = build_router(state)
        .layer(build_cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    let server_future = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    scheduler.stop().await;
    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origin.trim() == "*" {
        // Wildcard is for development only; incompatible with credentials.
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_credentials(false)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any);
    }

    match config.cors_origin.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any),
        Err(e) => {
            panic!(
                "FATAL: Invalid CORS_ORIGIN '{}': {}. \
                 Fix the CORS_ORIGIN environment variable.",
                config.cors_origin, e
            );
        }
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
