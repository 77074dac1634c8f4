use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub user_id: String,
    pub quest_id: String,
    pub done: bool,
}

impl Store {
    pub fn set_quest_progress(&self, progress: &QuestProgress) -> Result<(), StoreError> {
        let key = keys::quest_progress_key(&progress.user_id, &progress.quest_id);
        self.quest_progress
            .insert(key.as_bytes(), Self::serialize(progress)?)?;
        Ok(())
    }

    /// The `order` of the user's current unfinished stage: the minimum
    /// quest `order` (NOT quest id) among progress rows with done=false,
    /// ties broken by quest id. None when every stage is done or no
    /// progress rows exist.
    pub fn current_stage_order(&self, user_id: &str) -> Result<Option<u16>, StoreError> {
        let prefix = keys::quest_progress_prefix(user_id);
        let mut best: Option<(u16, String)> = None;
        for item in self.quest_progress.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let progress: QuestProgress = Self::deserialize(&value)?;
            if progress.done {
                continue;
            }
            let Some(quest) = self.get_quest(&progress.quest_id)? else {
                continue;
            };
            let candidate = (quest.order, progress.quest_id);
            match &best {
                Some(current) if *current <= candidate => {}
                _ => best = Some(candidate),
            }
        }
        Ok(best.map(|(order, _)| order))
    }
}
