use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::analytics::FeedbackPipeline;
use crate::config::Config;
use crate::scheduler::BatchScheduler;
use crate::services::oracle::OracleClient;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    oracle: Arc<OracleClient>,
    pipeline: Arc<FeedbackPipeline>,
    scheduler: Arc<BatchScheduler>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        oracle: Arc<OracleClient>,
        pipeline: Arc<FeedbackPipeline>,
        scheduler: Arc<BatchScheduler>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            oracle,
            pipeline,
            scheduler,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn oracle(&self) -> &OracleClient {
        &self.oracle
    }

    pub fn pipeline(&self) -> &FeedbackPipeline {
        &self.pipeline
    }

    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
