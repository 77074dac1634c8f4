use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::analytics::confusion::{confusion_report, ConfusionReport};
use crate::analytics::{FeedbackPipeline, TimeWindow};
use crate::store::{Store, StoreError};

/// Overall accuracy at or above this ratio counts as a strength.
const STRONG_ACCURACY: f64 = 0.8;
/// Category accuracy below this ratio counts as a weakness.
const WEAK_ACCURACY: f64 = 0.5;
/// How many confusion patterns and phonemes feed the recommendations.
const TOP_RECOMMENDATIONS: usize = 3;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn accuracy_ratio(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round3(f64::from(correct) / f64::from(total))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAccuracy {
    pub category: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Ratio in [0, 1], rounded to three decimal places.
    pub accuracy: f64,
}

/// Overall plus per-category accuracy over a window of answers. An
/// empty window yields zeros and a message instead of an error, so the
/// accuracy endpoint stays a plain 200 for new users.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracySummary {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub category_accuracy: Vec<CategoryAccuracy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn accuracy_summary(
    store: &Store,
    user_id: &str,
    window: TimeWindow,
) -> Result<AccuracySummary, StoreError> {
    let answers = store.answers_in_window(user_id, window.start, window.end)?;
    if answers.is_empty() {
        return Ok(AccuracySummary {
            total_questions: 0,
            correct_answers: 0,
            accuracy: 0.0,
            category_accuracy: Vec::new(),
            message: Some("No answers found in the specified period".to_string()),
        });
    }

    let mut correct = 0u32;
    let mut per_category: std::collections::BTreeMap<String, (u32, u32)> = Default::default();
    for answer in &answers {
        if answer.is_correct {
            correct += 1;
        }
        for tag in store.quest_tag_names(&answer.quest_id)? {
            let entry = per_category.entry(tag).or_insert((0, 0));
            entry.0 += 1;
            if answer.is_correct {
                entry.1 += 1;
            }
        }
    }

    let total = answers.len() as u32;
    Ok(AccuracySummary {
        total_questions: total,
        correct_answers: correct,
        accuracy: accuracy_ratio(correct, total),
        category_accuracy: per_category
            .into_iter()
            .map(|(category, (cat_total, cat_correct))| CategoryAccuracy {
                category,
                total_questions: cat_total,
                correct_answers: cat_correct,
                accuracy: accuracy_ratio(cat_correct, cat_total),
            })
            .collect(),
        message: None,
    })
}

/// One trailing sub-period of the progress series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub period_days: u32,
    pub total_questions: u32,
    /// Ratio in [0, 1], rounded to three decimal places.
    pub accuracy: f64,
    pub period_end: chrono::DateTime<chrono::Utc>,
}

/// Accuracy over the trailing 7/14/21/`days` windows. Sub-periods with
/// no answers are left out rather than reported as zero.
pub fn learning_progress(
    store: &Store,
    user_id: &str,
    days: u32,
) -> Result<Vec<ProgressPoint>, StoreError> {
    let mut periods: Vec<u32> = [7, 14, 21, days].into_iter().filter(|p| *p <= days).collect();
    periods.sort_unstable();
    periods.dedup();

    let mut points = Vec::new();
    for period in periods {
        let window = TimeWindow::trailing_days(period);
        let answers = store.answers_in_window(user_id, window.start, window.end)?;
        if answers.is_empty() {
            continue;
        }
        let correct = answers.iter().filter(|a| a.is_correct).count() as u32;
        let total = answers.len() as u32;
        points.push(ProgressPoint {
            period_days: period,
            total_questions: total,
            accuracy: accuracy_ratio(correct, total),
            period_end: window.end,
        });
    }
    Ok(points)
}

fn strengths(accuracy: &AccuracySummary) -> Vec<String> {
    let mut found = Vec::new();
    if accuracy.accuracy >= STRONG_ACCURACY {
        found.push("High overall accuracy".to_string());
    }
    for category in &accuracy.category_accuracy {
        if category.accuracy >= STRONG_ACCURACY {
            found.push(format!("Strong in {}", category.category));
        }
    }
    found
}

fn weaknesses(accuracy: &AccuracySummary) -> Vec<String> {
    accuracy
        .category_accuracy
        .iter()
        .filter(|category| category.accuracy < WEAK_ACCURACY)
        .map(|category| format!("Needs work in {}", category.category))
        .collect()
}

fn recommendations(confusion: &ConfusionReport) -> Vec<String> {
    let mut found: Vec<String> = confusion
        .confusion_patterns
        .iter()
        .take(TOP_RECOMMENDATIONS)
        .map(|p| format!("Practice distinguishing {}", p.pattern))
        .collect();
    found.extend(
        confusion
            .phonetic_confusions
            .iter()
            .take(TOP_RECOMMENDATIONS)
            .map(|p| format!("Review the {} sound", p.pattern)),
    );
    found
}

impl FeedbackPipeline {
    /// Comprehensive trailing-window report: accuracy breakdown,
    /// progress series, confusion analysis, rule-based guidance and an
    /// AI recommendation layer when the oracle cooperates. None when
    /// the user has no answers in the window.
    pub async fn comprehensive_report(
        &self,
        user_id: &str,
        days: u32,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let window = TimeWindow::trailing_days(days);
        let accuracy = accuracy_summary(&self.store, user_id, window)?;
        if accuracy.total_questions == 0 {
            return Ok(None);
        }

        let confusion = confusion_report(&self.store, user_id, window)?;
        let progress = learning_progress(&self.store, user_id, days)?;
        let performance = self.analyze_user_performance(user_id, days).await?;

        let strengths = strengths(&accuracy);
        let weaknesses = weaknesses(&accuracy);
        let recommendations = confusion
            .as_ref()
            .map(recommendations)
            .unwrap_or_default();

        let ai_recommendations = self
            .personalized_recommendations(user_id, days, &accuracy, &progress, &weaknesses)
            .await;

        Ok(Some(json!({
            "userId": user_id,
            "periodDays": days,
            "accuracy": accuracy,
            "progress": progress,
            "performance": performance,
            "strengths": strengths,
            "weaknesses": weaknesses,
            "recommendations": recommendations,
            "aiRecommendations": ai_recommendations.unwrap_or_else(|| json!({})),
            "generatedAt": chrono::Utc::now().to_rfc3339(),
        })))
    }

    /// Ask the oracle for tailored guidance over a JSON learner
    /// profile. None on any soft failure; the report carries rule-based
    /// recommendations regardless.
    async fn personalized_recommendations(
        &self,
        user_id: &str,
        days: u32,
        accuracy: &AccuracySummary,
        progress: &[ProgressPoint],
        weaknesses: &[String],
    ) -> Option<serde_json::Value> {
        let profile = json!({
            "accuracy": accuracy,
            "progress": progress,
            "weaknesses": weaknesses,
        });
        let context = HashMap::from([
            ("days", days.to_string()),
            ("profile", profile.to_string()),
        ]);

        let template = &self.prompts.personalized_recommendations;
        let prompt = match template.render(&context) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(user_id, %error, "Recommendation prompt failed to render");
                return None;
            }
        };
        self.oracle
            .generate(&prompt, template.format)
            .await
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }
}
