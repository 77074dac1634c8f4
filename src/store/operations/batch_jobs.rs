use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

pub const JOB_STATUS_RUNNING: &str = "running";
pub const JOB_STATUS_COMPLETED: &str = "completed";
pub const JOB_STATUS_FAILED: &str = "failed";

/// Job-history row. `result` is an opaque run-report blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: String,
    pub job_type: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processed_count: u32,
    pub error_count: u32,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl BatchJob {
    pub fn start(job_type: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            status: JOB_STATUS_RUNNING.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            processed_count: 0,
            error_count: 0,
            error_message: None,
            result: None,
        }
    }
}

impl Store {
    pub fn upsert_batch_job(&self, job: &BatchJob) -> Result<(), StoreError> {
        let key = keys::batch_job_key(job.started_at.timestamp_millis(), &job.id);
        self.batch_jobs
            .insert(key.as_bytes(), Self::serialize(job)?)?;
        Ok(())
    }

    pub fn get_batch_job(&self, job_id: &str) -> Result<Option<BatchJob>, StoreError> {
        let suffix = format!(":{job_id}");
        for item in self.batch_jobs.iter() {
            let (key, value) = item?;
            if String::from_utf8_lossy(&key).ends_with(&suffix) {
                return Ok(Some(Self::deserialize(&value)?));
            }
        }
        Ok(None)
    }

    /// Job history, newest first.
    pub fn list_batch_jobs(&self, limit: usize, offset: usize) -> Result<Vec<BatchJob>, StoreError> {
        let mut jobs = Vec::new();
        let mut skipped = 0usize;
        for item in self.batch_jobs.iter() {
            let (_, value) = item?;
            if skipped < offset {
                skipped += 1;
                continue;
            }
            jobs.push(Self::deserialize::<BatchJob>(&value)?);
            if jobs.len() >= limit {
                break;
            }
        }
        Ok(jobs)
    }

    pub fn count_batch_jobs_by_status(&self, status: &str) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for item in self.batch_jobs.iter() {
            let (_, value) = item?;
            let job: BatchJob = Self::deserialize(&value)?;
            if job.status == status {
                count += 1;
            }
        }
        Ok(count)
    }
}
