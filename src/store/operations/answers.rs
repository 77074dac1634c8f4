use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Structured phonetic metadata copied from the question at answer time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneticFeatures {
    pub target_phonemes: Vec<String>,
}

/// One item-level answer inside an attempt. Carries the expected and
/// given answers so confusion patterns can be tallied without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: String,
    pub user_id: String,
    pub quest_id: String,
    pub question_id: String,
    pub expected_answer: String,
    pub given_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
    pub phonetic_features: Option<PhoneticFeatures>,
}

impl Store {
    pub fn create_answer(&self, answer: &AnswerRecord) -> Result<(), StoreError> {
        let ts = answer.answered_at.timestamp_millis();
        let key = keys::answer_key(&answer.user_id, ts, &answer.id);
        self.answers
            .insert(key.as_bytes(), Self::serialize(answer)?)?;
        Ok(())
    }

    /// All answers for a user with `answered_at` in `[start, end)`.
    pub fn answers_in_window(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AnswerRecord>, StoreError> {
        let prefix = keys::answer_prefix(user_id);
        let mut answers = Vec::new();
        for item in self.answers.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let answer: AnswerRecord = Self::deserialize(&value)?;
            if answer.answered_at >= start && answer.answered_at < end {
                answers.push(answer);
            }
        }
        Ok(answers)
    }

    /// Full-tree window scan, used by the system-wide monthly summary.
    pub fn all_answers_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AnswerRecord>, StoreError> {
        let mut answers = Vec::new();
        for item in self.answers.iter() {
            let (_, value) = item?;
            let answer: AnswerRecord = Self::deserialize(&value)?;
            if answer.answered_at >= start && answer.answered_at < end {
                answers.push(answer);
            }
        }
        Ok(answers)
    }
}
