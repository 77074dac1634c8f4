use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::stats::accuracy_percent;
use crate::analytics::TimeWindow;
use crate::store::{Store, StoreError};

/// How many patterns of each kind the report keeps.
pub const TOP_PATTERNS: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCount {
    pub pattern: String,
    pub count: u32,
}

/// Wrong-answer pattern tally over a window of answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionReport {
    pub total_answers: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub confusion_patterns: Vec<PatternCount>,
    pub phonetic_confusions: Vec<PatternCount>,
}

/// Tally `expected -> given` pairs and target phonemes across the
/// user's wrong answers. None when the window holds no answers at all.
pub fn confusion_report(
    store: &Store,
    user_id: &str,
    window: TimeWindow,
) -> Result<Option<ConfusionReport>, StoreError> {
    let answers = store.answers_in_window(user_id, window.start, window.end)?;
    if answers.is_empty() {
        return Ok(None);
    }

    let mut correct = 0u32;
    let mut pairs: BTreeMap<String, u32> = BTreeMap::new();
    let mut phonemes: BTreeMap<String, u32> = BTreeMap::new();
    for answer in &answers {
        if answer.is_correct {
            correct += 1;
            continue;
        }
        let pattern = format!("{} -> {}", answer.expected_answer, answer.given_answer);
        *pairs.entry(pattern).or_insert(0) += 1;
        if let Some(features) = &answer.phonetic_features {
            for phoneme in &features.target_phonemes {
                *phonemes.entry(phoneme.clone()).or_insert(0) += 1;
            }
        }
    }

    let total = answers.len() as u32;
    Ok(Some(ConfusionReport {
        total_answers: total,
        correct_answers: correct,
        accuracy: accuracy_percent(correct, total),
        confusion_patterns: top_patterns(pairs),
        phonetic_confusions: top_patterns(phonemes),
    }))
}

/// Highest counts first; equal counts fall back to lexical pattern
/// order so the cut at TOP_PATTERNS is deterministic.
fn top_patterns(counts: BTreeMap<String, u32>) -> Vec<PatternCount> {
    let mut patterns: Vec<PatternCount> = counts
        .into_iter()
        .map(|(pattern, count)| PatternCount { pattern, count })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
    patterns.truncate(TOP_PATTERNS);
    patterns
}
