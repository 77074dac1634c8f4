use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use analytics_backend::store::operations::answers::{AnswerRecord, PhoneticFeatures};
use analytics_backend::store::operations::attempts::LearningAttempt;
use analytics_backend::store::operations::progress::QuestProgress;
use analytics_backend::store::operations::quests::Quest;
use analytics_backend::store::Store;

/// Fixture day every HTTP test targets (UTC offset 0 in the test config,
/// so the window is exactly this calendar day in UTC).
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date")
}

pub fn fixture_instant(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0)
        .single()
        .expect("valid instant")
}

pub fn seed_quest(store: &Store, id: &str, order: u16, tags: &[&str]) {
    store
        .upsert_quest(&Quest {
            id: id.to_string(),
            title: format!("quest {id}"),
            quest_type: "listening".to_string(),
            order,
            item_count: 10,
        })
        .expect("seed quest");
    for tag in tags {
        store.add_quest_tag(id, tag).expect("seed quest tag");
    }
}

pub fn seed_attempt(
    store: &Store,
    user_id: &str,
    quest_id: &str,
    started_at: DateTime<Utc>,
    total: u32,
    correct: u32,
) {
    store
        .create_attempt(&LearningAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quest_id: quest_id.to_string(),
            started_at,
            ended_at: Some(started_at + Duration::minutes(10)),
            total_items: total,
            correct_items: correct,
            time_spent_secs: Some(600),
            accuracy_rate: if total > 0 {
                f64::from(correct) / f64::from(total) * 100.0
            } else {
                0.0
            },
        })
        .expect("seed attempt");
}

pub fn seed_answer(
    store: &Store,
    user_id: &str,
    answered_at: DateTime<Utc>,
    expected: &str,
    given: &str,
    correct: bool,
    phonemes: &[&str],
) {
    store
        .create_answer(&AnswerRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quest_id: "q1".to_string(),
            question_id: uuid::Uuid::new_v4().to_string(),
            expected_answer: expected.to_string(),
            given_answer: given.to_string(),
            is_correct: correct,
            answered_at,
            phonetic_features: if phonemes.is_empty() {
                None
            } else {
                Some(PhoneticFeatures {
                    target_phonemes: phonemes.iter().map(|p| p.to_string()).collect(),
                })
            },
        })
        .expect("seed answer");
}

pub fn seed_progress(store: &Store, user_id: &str, quest_id: &str, done: bool) {
    store
        .set_quest_progress(&QuestProgress {
            user_id: user_id.to_string(),
            quest_id: quest_id.to_string(),
            done,
        })
        .expect("seed progress");
}
