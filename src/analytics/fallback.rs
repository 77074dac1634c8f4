use crate::analytics::stats::StatisticsSummary;
use crate::store::operations::feedback::FeedbackContent;

pub const EXCELLENT_MIN_ACCURACY: f64 = 80.0;
pub const GOOD_MIN_ACCURACY: f64 = 60.0;

/// Deterministic feedback used whenever the oracle is unavailable or
/// returns something unusable. Three bands keyed on daily accuracy.
pub fn fallback_feedback(stats: &StatisticsSummary) -> FeedbackContent {
    if stats.accuracy >= EXCELLENT_MIN_ACCURACY {
        FeedbackContent {
            title: "Outstanding results today!".to_string(),
            message: format!(
                "An accuracy of {:.1}% is excellent work. Keep this pace going and the next stage is within reach!",
                stats.accuracy
            ),
            tags: Some("#excellent,#high-accuracy,#steady-growth".to_string()),
        }
    } else if stats.accuracy >= GOOD_MIN_ACCURACY {
        FeedbackContent {
            title: "Good progress today!".to_string(),
            message: format!(
                "{} of {} questions right. A little more practice will push you even further.",
                stats.correct_items, stats.total_items
            ),
            tags: Some("#improving,#keep-practicing,#almost-there".to_string()),
        }
    } else {
        FeedbackContent {
            title: "Another step forward!".to_string(),
            message: "Finishing a session is a win on its own. Reviewing the questions you missed will make the next one easier.".to_string(),
            tags: Some("#challenge,#review,#keep-going".to_string()),
        }
    }
}
