use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::services::oracle::ResponseFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt context is missing field '{0}'")]
    MissingField(String),
    #[error("unterminated '{{' placeholder in template")]
    UnterminatedPlaceholder,
}

/// One named prompt. `user_template` uses `{name}` placeholders filled
/// from a context map; a missing field fails the render rather than
/// silently emitting a partial prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub system_prompt: String,
    pub user_template: String,
    #[serde(default)]
    pub format: ResponseFormat,
}

impl PromptTemplate {
    pub fn render(&self, context: &HashMap<&str, String>) -> Result<String, PromptError> {
        let user = interpolate(&self.user_template, context)?;
        Ok(format!("{}\n\n{}", self.system_prompt, user))
    }
}

fn interpolate(template: &str, context: &HashMap<&str, String>) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or(PromptError::UnterminatedPlaceholder)?;
        let name = &after[..close];
        let value = context
            .get(name)
            .ok_or_else(|| PromptError::MissingField(name.to_string()))?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[derive(Debug, Deserialize, Default)]
struct PromptFile {
    daily_feedback: Option<PromptTemplate>,
    confusion_analysis: Option<PromptTemplate>,
    personalized_recommendations: Option<PromptTemplate>,
}

/// The prompt set the pipeline runs with. Operators can override any
/// template in a TOML file; anything absent falls back to the built-ins.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub daily_feedback: PromptTemplate,
    pub confusion_analysis: PromptTemplate,
    pub personalized_recommendations: PromptTemplate,
}

impl PromptLibrary {
    pub fn builtin() -> Self {
        Self {
            daily_feedback: PromptTemplate {
                system_prompt: "You are a learning coach for a pronunciation training app. \
                    Write warm, encouraging feedback in plain sentences without emoji. \
                    Respond with JSON only, using exactly the keys \"summary\", \"praise\" \
                    and \"motivation\"."
                    .to_string(),
                user_template: "Today's learning results:\n\
                    - accuracy: {accuracy}%\n\
                    - answered questions: {total_questions}\n\
                    - quests completed today: {completed_quests}\n\
                    - distinct quest types: {quest_types_count}\n\
                    - quests completed overall: {total_completed_quests}\n\
                    - best category: {best_category}\n\
                    - growth stage: {growth_stage}"
                    .to_string(),
                format: ResponseFormat::Structured,
            },
            confusion_analysis: PromptTemplate {
                system_prompt: "You are a learning feedback expert. Analyze the answer data \
                    and respond with JSON only, using exactly the keys \"summary\", \
                    \"strengths\", \"weaknesses\" and \"recommendations\"."
                    .to_string(),
                user_template: "Learner answer data for the last {days} days:\n\
                    - total answers: {total_answers}\n\
                    - accuracy: {accuracy}%\n\n\
                    Most frequent confusion patterns:\n{confusion_patterns}\n\n\
                    Most frequent phonetic confusions:\n{phonetic_confusions}"
                    .to_string(),
                format: ResponseFormat::Structured,
            },
            personalized_recommendations: PromptTemplate {
                system_prompt: "You are a pronunciation learning coach. Based on the \
                    learner profile, respond with JSON only, using exactly the keys \
                    \"priority_skills\", \"practice_exercises\", \
                    \"difficulty_adjustment\" and \"motivational_message\". Each entry \
                    in \"practice_exercises\" has the keys \"type\", \"description\" \
                    and \"frequency\"."
                    .to_string(),
                user_template: "Learner profile over the last {days} days, as JSON:\n\
                    {profile}"
                    .to_string(),
                format: ResponseFormat::Structured,
            },
        }
    }

    /// Load overrides from `path`. A missing file is normal (built-ins
    /// apply); a present but malformed file is logged and ignored.
    pub fn load(path: &str) -> Self {
        let builtin = Self::builtin();
        if !Path::new(path).exists() {
            info!(path, "No prompt override file; using built-in templates");
            return builtin;
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path, %error, "Failed to read prompt file; using built-in templates");
                return builtin;
            }
        };
        let file: PromptFile = match toml::from_str(&raw) {
            Ok(file) => file,
            Err(error) => {
                warn!(path, %error, "Malformed prompt file; using built-in templates");
                return builtin;
            }
        };
        Self {
            daily_feedback: file.daily_feedback.unwrap_or(builtin.daily_feedback),
            confusion_analysis: file
                .confusion_analysis
                .unwrap_or(builtin.confusion_analysis),
            personalized_recommendations: file
                .personalized_recommendations
                .unwrap_or(builtin.personalized_recommendations),
        }
    }
}
