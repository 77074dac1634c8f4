use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::analytics::growth::{self, GrowthStage, GrowthStageConfig};
use crate::analytics::TimeWindow;
use crate::store::{Store, StoreError};

/// The category (quest tag) with the highest answer accuracy in the window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestCategory {
    pub name: String,
    pub accuracy: f64,
}

/// Everything the prompt assembler and the API need about one user's day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub total_items: u32,
    pub correct_items: u32,
    /// Percentage in [0, 100], rounded to one decimal place.
    pub accuracy: f64,
    pub quest_types_count: usize,
    pub completed_quests: usize,
    pub lifetime_completed_quests: u64,
    pub best_category: Option<BestCategory>,
    pub current_stage_order: u16,
    pub growth_stage: GrowthStage,
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn accuracy_percent(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(f64::from(correct) / f64::from(total) * 100.0)
}

/// Aggregate one user's attempts inside the window into a summary.
/// Returns None when the user has no attempts there; callers treat that
/// as "nothing to generate", not as an error.
pub fn daily_statistics(
    store: &Store,
    user_id: &str,
    window: TimeWindow,
    growth_config: &GrowthStageConfig,
) -> Result<Option<StatisticsSummary>, StoreError> {
    let attempts = store.attempts_in_window(user_id, window.start, window.end)?;
    if attempts.is_empty() {
        return Ok(None);
    }

    let mut total_items = 0u32;
    let mut correct_items = 0u32;
    let mut completed_quests = 0usize;
    let mut quest_ids: BTreeSet<&str> = BTreeSet::new();
    for attempt in &attempts {
        total_items += attempt.total_items;
        correct_items += attempt.correct_items;
        if attempt.ended_at.is_some() {
            completed_quests += 1;
        }
        quest_ids.insert(attempt.quest_id.as_str());
    }

    let mut category_totals: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for attempt in &attempts {
        for tag in store.quest_tag_names(&attempt.quest_id)? {
            let entry = category_totals.entry(tag).or_insert((0, 0));
            entry.0 += attempt.total_items;
            entry.1 += attempt.correct_items;
        }
    }
    // Strictly-greater replacement over a BTreeMap: ties keep the
    // lexicographically smaller category name.
    let mut best_category: Option<BestCategory> = None;
    for (name, (total, correct)) in &category_totals {
        if *total == 0 {
            continue;
        }
        let accuracy = accuracy_percent(*correct, *total);
        let better = match &best_category {
            Some(current) => accuracy > current.accuracy,
            None => true,
        };
        if better {
            best_category = Some(BestCategory {
                name: name.clone(),
                accuracy,
            });
        }
    }

    let current_stage_order = store.current_stage_order(user_id)?.unwrap_or(1);

    Ok(Some(StatisticsSummary {
        total_items,
        correct_items,
        accuracy: accuracy_percent(correct_items, total_items),
        quest_types_count: quest_ids.len(),
        completed_quests,
        lifetime_completed_quests: store.count_completed_attempts(user_id)?,
        best_category,
        current_stage_order,
        growth_stage: growth::classify(current_stage_order, growth_config),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::store::operations::attempts::LearningAttempt;
    use crate::store::operations::quests::Quest;

    use super::*;

    fn window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        TimeWindow {
            start,
            end: start + Duration::days(1),
        }
    }

    fn seed_quest(store: &Store, id: &str, order: u16, tags: &[&str]) {
        store
            .upsert_quest(&Quest {
                id: id.to_string(),
                title: format!("quest {id}"),
                quest_type: "listening".to_string(),
                order,
                item_count: 10,
            })
            .unwrap();
        for tag in tags {
            store.add_quest_tag(id, tag).unwrap();
        }
    }

    fn seed_attempt(
        store: &Store,
        id: &str,
        quest_id: &str,
        at: DateTime<Utc>,
        total: u32,
        correct: u32,
    ) {
        store
            .create_attempt(&LearningAttempt {
                id: id.to_string(),
                user_id: "u1".to_string(),
                quest_id: quest_id.to_string(),
                started_at: at,
                ended_at: Some(at + Duration::minutes(10)),
                total_items: total,
                correct_items: correct,
                time_spent_secs: Some(600),
                accuracy_rate: 0.0,
            })
            .unwrap();
    }

    #[test]
    fn empty_window_yields_none() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("stats-db").to_str().unwrap()).unwrap();
        let summary =
            daily_statistics(&store, "u1", window(), &GrowthStageConfig::default()).unwrap();
        assert!(summary.is_none());
    }

    #[test]
    fn aggregates_and_rounds_accuracy() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("stats-db2").to_str().unwrap()).unwrap();
        let w = window();

        seed_quest(&store, "q1", 3, &[]);
        seed_attempt(&store, "a1", "q1", w.start + Duration::hours(1), 10, 8);
        seed_attempt(&store, "a2", "q1", w.start + Duration::hours(2), 5, 4);

        let summary = daily_statistics(&store, "u1", w, &GrowthStageConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_items, 15);
        assert_eq!(summary.correct_items, 12);
        assert_eq!(summary.accuracy, 80.0);
        assert_eq!(summary.quest_types_count, 1);
        assert_eq!(summary.completed_quests, 2);
        assert_eq!(summary.lifetime_completed_quests, 2);
        // No unfinished progress rows: stage order defaults to 1 (seed).
        assert_eq!(summary.current_stage_order, 1);
        assert_eq!(summary.growth_stage, GrowthStage::Seed);
    }

    #[test]
    fn best_category_wins_on_accuracy_not_volume() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("stats-db3").to_str().unwrap()).unwrap();
        let w = window();

        seed_quest(&store, "q1", 1, &["vowels"]);
        seed_quest(&store, "q2", 2, &["consonants"]);
        seed_attempt(&store, "a1", "q1", w.start + Duration::hours(1), 10, 9);
        seed_attempt(&store, "a2", "q2", w.start + Duration::hours(2), 5, 2);

        let summary = daily_statistics(&store, "u1", w, &GrowthStageConfig::default())
            .unwrap()
            .unwrap();
        let best = summary.best_category.unwrap();
        assert_eq!(best.name, "vowels");
        assert_eq!(best.accuracy, 90.0);
    }

    #[test]
    fn best_category_tie_prefers_lexically_smaller_name() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("stats-db4").to_str().unwrap()).unwrap();
        let w = window();

        seed_quest(&store, "q1", 1, &["vowels"]);
        seed_quest(&store, "q2", 2, &["consonants"]);
        seed_attempt(&store, "a1", "q1", w.start + Duration::hours(1), 10, 8);
        seed_attempt(&store, "a2", "q2", w.start + Duration::hours(2), 10, 8);

        let summary = daily_statistics(&store, "u1", w, &GrowthStageConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(summary.best_category.unwrap().name, "consonants");
    }

    #[test]
    fn accuracy_percent_handles_zero_total() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
        assert_eq!(accuracy_percent(1, 3), 33.3);
    }
}
