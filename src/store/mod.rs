pub mod keys;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub quests: sled::Tree,
    pub quest_tags: sled::Tree,
    pub attempts: sled::Tree,
    pub attempts_by_time: sled::Tree,
    pub answers: sled::Tree,
    pub quest_progress: sled::Tree,
    pub day_anchors: sled::Tree,
    pub feedbacks: sled::Tree,
    pub batch_jobs: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let quests = db.open_tree(trees::QUESTS)?;
        let quest_tags = db.open_tree(trees::QUEST_TAGS)?;
        let attempts = db.open_tree(trees::ATTEMPTS)?;
        let attempts_by_time = db.open_tree(trees::ATTEMPTS_BY_TIME)?;
        let answers = db.open_tree(trees::ANSWERS)?;
        let quest_progress = db.open_tree(trees::QUEST_PROGRESS)?;
        let day_anchors = db.open_tree(trees::DAY_ANCHORS)?;
        let feedbacks = db.open_tree(trees::FEEDBACKS)?;
        let batch_jobs = db.open_tree(trees::BATCH_JOBS)?;

        Ok(Self {
            db,
            quests,
            quest_tags,
            attempts,
            attempts_by_time,
            answers,
            quest_progress,
            day_anchors,
            feedbacks,
            batch_jobs,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
