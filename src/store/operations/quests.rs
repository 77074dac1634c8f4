use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// A quest (stage) in the learning sequence. `order` is the explicit
/// sequencing field; quest ids are not guaranteed to follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub quest_type: String,
    pub order: u16,
    pub item_count: u32,
}

impl Store {
    pub fn upsert_quest(&self, quest: &Quest) -> Result<(), StoreError> {
        let key = keys::quest_key(&quest.id);
        self.quests.insert(key.as_bytes(), Self::serialize(quest)?)?;
        Ok(())
    }

    pub fn get_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError> {
        match self.quests.get(keys::quest_key(quest_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn add_quest_tag(&self, quest_id: &str, tag: &str) -> Result<(), StoreError> {
        let key = keys::quest_tag_key(quest_id, tag);
        self.quest_tags.insert(key.as_bytes(), &[])?;
        Ok(())
    }

    /// Category tags attached to a quest, in lexical order.
    pub fn quest_tag_names(&self, quest_id: &str) -> Result<Vec<String>, StoreError> {
        let prefix = keys::quest_tag_prefix(quest_id);
        let mut tags = Vec::new();
        for item in self.quest_tags.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let key_text = String::from_utf8_lossy(&key);
            if let Some(tag) = key_text.strip_prefix(&prefix) {
                tags.push(tag.to_string());
            }
        }
        Ok(tags)
    }
}
