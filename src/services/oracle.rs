use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::OracleConfig;
use crate::store::operations::feedback::FeedbackContent;

/// How a prompt asks the oracle to shape its reply. Structured requests
/// constrain the model to a single JSON object; freeform leaves it prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Structured,
    Freeform,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

/// Thin client for the local inference server. Generation failures are
/// availability signals, not errors: callers get None and fall back.
#[derive(Debug, Clone)]
pub struct OracleClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    health_client: reqwest::Client,
}

impl OracleClient {
    pub fn new(config: &OracleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        let health_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.health_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            health_client,
        }
    }

    /// One non-streaming completion. Returns the raw reply text, or None
    /// on transport failure, timeout, non-2xx status or an undecodable
    /// body. Never surfaces an error to the caller.
    pub async fn generate(&self, prompt: &str, format: ResponseFormat) -> Option<String> {
        let url = format!("{}/api/generate", self.base_url);
        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if format == ResponseFormat::Structured {
            body["format"] = json!("json");
        }

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "Oracle request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "Oracle returned non-success status");
            return None;
        }
        match response.json::<GenerateReply>().await {
            Ok(reply) => Some(reply.response),
            Err(error) => {
                warn!(%error, "Oracle reply body was not decodable");
                None
            }
        }
    }

    /// Liveness probe against the model listing endpoint, on a short
    /// timeout so health checks stay fast when the server is down.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.health_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

const DEFAULT_TITLE: &str = "You studied hard again today!";
const DEFAULT_MESSAGE: &str = "Keep up the steady effort and the results will follow.";
const DEFAULT_TAGS: &str = "#daily-learning,#keep-going";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabeledField {
    Title,
    Message,
    Tags,
}

/// Label tokens recognized in freeform replies, tried top to bottom per
/// line. Korean spellings first since most deployed prompts are Korean.
const LABEL_TABLE: &[(&str, LabeledField)] = &[
    ("제목", LabeledField::Title),
    ("title", LabeledField::Title),
    ("메시지", LabeledField::Message),
    ("message", LabeledField::Message),
    ("해시태그", LabeledField::Tags),
    ("tag", LabeledField::Tags),
];

/// Best-effort extraction of title/message/tags from a prose reply.
/// Scans line by line for a known label followed by ':'; fields the
/// reply never labels keep their defaults. Total: never fails.
pub fn extract_labeled_fields(raw: &str) -> FeedbackContent {
    let mut title = DEFAULT_TITLE.to_string();
    let mut message = DEFAULT_MESSAGE.to_string();
    let mut tags = DEFAULT_TAGS.to_string();

    for line in raw.lines() {
        let lower = line.to_lowercase();
        let Some(entry) = LABEL_TABLE.iter().find(|entry| lower.contains(entry.0)) else {
            continue;
        };
        let Some((_, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match entry.1 {
            LabeledField::Title => title = value.to_string(),
            LabeledField::Message => message = value.to_string(),
            LabeledField::Tags => tags = value.to_string(),
        }
    }

    FeedbackContent {
        title,
        message,
        tags: Some(tags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_korean_labels() {
        let raw = "제목: 오늘도 수고했어요\n메시지: 발음이 좋아지고 있어요\n해시태그: #성장,#꾸준함";
        let content = extract_labeled_fields(raw);
        assert_eq!(content.title, "오늘도 수고했어요");
        assert_eq!(content.message, "발음이 좋아지고 있어요");
        assert_eq!(content.tags.as_deref(), Some("#성장,#꾸준함"));
    }

    #[test]
    fn extracts_english_labels_case_insensitively() {
        let raw = "Title: Great session\nMessage: Accuracy is climbing\nTags: #up";
        let content = extract_labeled_fields(raw);
        assert_eq!(content.title, "Great session");
        assert_eq!(content.message, "Accuracy is climbing");
        assert_eq!(content.tags.as_deref(), Some("#up"));
    }

    #[test]
    fn unlabeled_fields_keep_defaults() {
        let content = extract_labeled_fields("Title: only a title here");
        assert_eq!(content.title, "only a title here");
        assert_eq!(content.message, DEFAULT_MESSAGE);
        assert_eq!(content.tags.as_deref(), Some(DEFAULT_TAGS));

        let empty = extract_labeled_fields("free prose with no labels at all");
        assert_eq!(empty.title, DEFAULT_TITLE);
    }

    #[test]
    fn empty_values_after_colon_are_ignored() {
        let content = extract_labeled_fields("Title:   \nMessage: real content");
        assert_eq!(content.title, DEFAULT_TITLE);
        assert_eq!(content.message, "real content");
    }

    #[tokio::test]
    async fn unreachable_oracle_reports_unavailable() {
        let client = OracleClient::new(&crate::config::OracleConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "gemma".to_string(),
            timeout_secs: 1,
            health_timeout_secs: 1,
        });
        assert!(client.generate("hi", ResponseFormat::Structured).await.is_none());
        assert!(!client.health_check().await);
    }
}
