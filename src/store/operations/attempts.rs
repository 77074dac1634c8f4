use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// One engagement of a user with a quest. Immutable once the attempt
/// is closed; this store never mutates existing rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAttempt {
    pub id: String,
    pub user_id: String,
    pub quest_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_items: u32,
    pub correct_items: u32,
    pub time_spent_secs: Option<u32>,
    pub accuracy_rate: f64,
}

impl Store {
    pub fn create_attempt(&self, attempt: &LearningAttempt) -> Result<(), StoreError> {
        let ts = attempt.started_at.timestamp_millis();
        let key = keys::attempt_key(&attempt.user_id, ts, &attempt.id);
        self.attempts
            .insert(key.as_bytes(), Self::serialize(attempt)?)?;
        // Forward time index for eligible-user discovery.
        let time_key = keys::attempt_time_key(ts, &attempt.id);
        self.attempts_by_time
            .insert(time_key.as_bytes(), attempt.user_id.as_bytes())?;
        Ok(())
    }

    /// All attempts for a user with `started_at` in `[start, end)`.
    pub fn attempts_in_window(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        let prefix = keys::attempt_prefix(user_id);
        let mut attempts = Vec::new();
        for item in self.attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let attempt: LearningAttempt = Self::deserialize(&value)?;
            if attempt.started_at >= start && attempt.started_at < end {
                attempts.push(attempt);
            }
        }
        Ok(attempts)
    }

    /// Lifetime count of completed attempts (non-null end timestamp).
    pub fn count_completed_attempts(&self, user_id: &str) -> Result<u64, StoreError> {
        let prefix = keys::attempt_prefix(user_id);
        let mut count = 0u64;
        for item in self.attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let attempt: LearningAttempt = Self::deserialize(&value)?;
            if attempt.ended_at.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Distinct users with at least one attempt starting in `[start, end)`,
    /// sorted by user id for reproducible batch partitioning.
    pub fn eligible_user_ids(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let lower = keys::attempt_time_bound(start.timestamp_millis());
        let upper = keys::attempt_time_bound(end.timestamp_millis());
        let mut users: BTreeSet<String> = BTreeSet::new();
        for item in self
            .attempts_by_time
            .range(lower.as_bytes()..upper.as_bytes())
        {
            let (_, value) = item?;
            users.insert(String::from_utf8_lossy(&value).to_string());
        }
        Ok(users.into_iter().collect())
    }
}
