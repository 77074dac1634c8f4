use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Column bounds inherited from the upstream schema. Overlength input
/// is truncated at this boundary, never rejected.
pub const TITLE_MAX_CHARS: usize = 100;
pub const MESSAGE_MAX_CHARS: usize = 500;
pub const TAGS_MAX_CHARS: usize = 500;

/// The per-user-per-day row feedback content attaches to. At most one
/// exists per (user, day); `feedback_id` points at the newest content row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAnchor {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub feedback_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub anchor_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub tags: Option<String>,
}

/// Unbounded feedback content produced by the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackContent {
    pub title: String,
    pub message: String,
    pub tags: Option<String>,
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl Store {
    pub fn get_day_anchor(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DayAnchor>, StoreError> {
        let key = keys::day_anchor_key(user_id, date);
        match self.day_anchors.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Attach generated feedback to the (user, day) anchor, creating the
    /// anchor lazily. The anchor get-or-create, the anchor upsert and
    /// the content insert all run in one transaction: concurrent saves
    /// for the same day agree on a single anchor id, and any abort
    /// rolls both trees back.
    pub fn save_feedback(
        &self,
        user_id: &str,
        date: NaiveDate,
        content: &FeedbackContent,
    ) -> Result<FeedbackRecord, StoreError> {
        let now = Utc::now();
        let record_id = uuid::Uuid::new_v4().to_string();
        // Only used when this transaction is the one creating the anchor.
        let new_anchor_id = uuid::Uuid::new_v4().to_string();
        let anchor_key = keys::day_anchor_key(user_id, date);
        let record_key = keys::feedback_key(user_id, now.timestamp_millis(), &record_id);

        let title = truncate_chars(&content.title, TITLE_MAX_CHARS);
        let message = truncate_chars(&content.message, MESSAGE_MAX_CHARS);
        let tags = content
            .tags
            .as_deref()
            .map(|t| truncate_chars(t, TAGS_MAX_CHARS));

        (&self.day_anchors, &self.feedbacks)
            .transaction(|(tx_anchors, tx_feedbacks)| {
                use sled::transaction::ConflictableTransactionError;

                let mut anchor = match tx_anchors.get(anchor_key.as_bytes())? {
                    Some(raw) => Self::deserialize::<DayAnchor>(&raw)
                        .map_err(ConflictableTransactionError::Abort)?,
                    None => DayAnchor {
                        id: new_anchor_id.clone(),
                        user_id: user_id.to_string(),
                        date,
                        created_at: now,
                        feedback_id: None,
                    },
                };

                let record = FeedbackRecord {
                    id: record_id.clone(),
                    anchor_id: anchor.id.clone(),
                    user_id: user_id.to_string(),
                    date,
                    created_at: now,
                    title: title.clone(),
                    message: message.clone(),
                    tags: tags.clone(),
                };
                anchor.feedback_id = Some(record.id.clone());

                let anchor_bytes =
                    Self::serialize(&anchor).map_err(ConflictableTransactionError::Abort)?;
                let record_bytes =
                    Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                tx_anchors.insert(anchor_key.as_bytes(), anchor_bytes)?;
                tx_feedbacks.insert(record_key.as_bytes(), record_bytes)?;
                Ok(record)
            })
            .map_err(
                |error: sled::transaction::TransactionError<StoreError>| match error {
                    sled::transaction::TransactionError::Abort(store_error) => store_error,
                    sled::transaction::TransactionError::Storage(storage_error) => {
                        StoreError::Sled(storage_error)
                    }
                },
            )
    }

    /// Most recently created feedback row for the user, if any.
    pub fn latest_feedback(&self, user_id: &str) -> Result<Option<FeedbackRecord>, StoreError> {
        let prefix = keys::feedback_prefix(user_id);
        for item in self.feedbacks.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            return Ok(Some(Self::deserialize(&value)?));
        }
        Ok(None)
    }

    /// Newest feedback row attached to the given calendar day.
    pub fn feedback_by_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        let prefix = keys::feedback_prefix(user_id);
        for item in self.feedbacks.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let record: FeedbackRecord = Self::deserialize(&value)?;
            if record.date == date {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
