use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analytics::confusion::{confusion_report, PatternCount};
use crate::analytics::fallback::fallback_feedback;
use crate::analytics::prompt::PromptError;
use crate::analytics::stats::{daily_statistics, StatisticsSummary};
use crate::analytics::{FeedbackPipeline, TimeWindow};
use crate::services::oracle::{extract_labeled_fields, ResponseFormat};
use crate::store::operations::feedback::{FeedbackContent, FeedbackRecord};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("no learning data for user {user_id} on {date}")]
    NoData { user_id: String, date: NaiveDate },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Generated content plus the statistics it was derived from.
#[derive(Debug, Clone)]
pub struct GeneratedFeedback {
    pub content: FeedbackContent,
    pub stats: StatisticsSummary,
}

/// Shape the structured daily prompt asks the oracle for.
#[derive(Debug, Deserialize)]
struct StructuredReply {
    summary: String,
    praise: String,
    motivation: String,
}

fn parse_structured_reply(raw: &str) -> Option<FeedbackContent> {
    let reply: StructuredReply = serde_json::from_str(raw).ok()?;
    Some(FeedbackContent {
        title: reply.summary,
        message: format!("{}\n{}", reply.praise, reply.motivation),
        tags: None,
    })
}

fn daily_prompt_context(stats: &StatisticsSummary) -> HashMap<&'static str, String> {
    let best_category = match &stats.best_category {
        Some(best) => format!("{} ({:.1}%)", best.name, best.accuracy),
        None => "none".to_string(),
    };
    HashMap::from([
        ("accuracy", format!("{:.1}", stats.accuracy)),
        ("total_questions", stats.total_items.to_string()),
        ("completed_quests", stats.completed_quests.to_string()),
        ("quest_types_count", stats.quest_types_count.to_string()),
        (
            "total_completed_quests",
            stats.lifetime_completed_quests.to_string(),
        ),
        ("best_category", best_category),
        ("growth_stage", stats.growth_stage.label().to_string()),
    ])
}

fn format_patterns(patterns: &[PatternCount]) -> String {
    if patterns.is_empty() {
        return "none".to_string();
    }
    patterns
        .iter()
        .map(|p| format!("- {} ({}x)", p.pattern, p.count))
        .collect::<Vec<_>>()
        .join("\n")
}

impl FeedbackPipeline {
    /// Aggregate, assemble the prompt and ask the oracle. Falls back to
    /// deterministic content when the oracle is down or replies with
    /// something unusable; the only hard failures are missing data and
    /// storage errors.
    pub async fn build_daily_content(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<GeneratedFeedback, FeedbackError> {
        let window = TimeWindow::for_local_day(date, self.batch.tz_offset());
        let stats = daily_statistics(&self.store, user_id, window, &self.growth)?.ok_or_else(
            || FeedbackError::NoData {
                user_id: user_id.to_string(),
                date,
            },
        )?;

        let template = &self.prompts.daily_feedback;
        let prompt = template.render(&daily_prompt_context(&stats))?;

        let content = match self.oracle.generate(&prompt, template.format).await {
            Some(raw) => match template.format {
                ResponseFormat::Structured => parse_structured_reply(&raw).unwrap_or_else(|| {
                    warn!(user_id, "Oracle reply was not the expected JSON shape; using fallback");
                    fallback_feedback(&stats)
                }),
                ResponseFormat::Freeform => extract_labeled_fields(&raw),
            },
            None => {
                warn!(user_id, "Oracle unavailable; using deterministic fallback");
                fallback_feedback(&stats)
            }
        };

        Ok(GeneratedFeedback { content, stats })
    }

    /// Full per-user path: generate and persist.
    pub async fn generate_for_user(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<FeedbackRecord, FeedbackError> {
        let generated = self.build_daily_content(user_id, date).await?;
        debug!(user_id, %date, "Persisting generated feedback");
        Ok(self.store.save_feedback(user_id, date, &generated.content)?)
    }

    /// Confusion analysis over the trailing `days` days, with an AI
    /// insight layer when the oracle cooperates. None when the user has
    /// no answers in the window.
    pub async fn analyze_user_performance(
        &self,
        user_id: &str,
        days: u32,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let window = TimeWindow::trailing_days(days);
        let Some(report) = confusion_report(&self.store, user_id, window)? else {
            return Ok(None);
        };

        let context = HashMap::from([
            ("days", days.to_string()),
            ("total_answers", report.total_answers.to_string()),
            ("accuracy", format!("{:.1}", report.accuracy)),
            (
                "confusion_patterns",
                format_patterns(&report.confusion_patterns),
            ),
            (
                "phonetic_confusions",
                format_patterns(&report.phonetic_confusions),
            ),
        ]);

        let template = &self.prompts.confusion_analysis;
        let insights = match template.render(&context) {
            Ok(prompt) => self
                .oracle
                .generate(&prompt, template.format)
                .await
                .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok()),
            Err(error) => {
                warn!(%error, "Analysis prompt failed to render; returning basic stats only");
                None
            }
        };

        Ok(Some(json!({
            "userId": user_id,
            "periodDays": days,
            "basicStats": report,
            "aiInsights": insights
                .unwrap_or_else(|| json!({ "message": "AI analysis not available" })),
            "analysisDate": Utc::now().to_rfc3339(),
        })))
    }
}
