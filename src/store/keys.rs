use chrono::NaiveDate;

pub fn quest_key(quest_id: &str) -> String {
    quest_id.to_string()
}

pub fn quest_tag_key(quest_id: &str, tag: &str) -> String {
    format!("{}:{}", quest_id, tag)
}

pub fn quest_tag_prefix(quest_id: &str) -> String {
    format!("{}:", quest_id)
}

/// Per-user attempts, newest first: `{user_id}:{reverse_ts:020}:{attempt_id}`.
pub fn attempt_key(user_id: &str, timestamp_ms: i64, attempt_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{}:{:020}:{}", user_id, reverse_ts, attempt_id)
}

pub fn attempt_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

/// Forward time index used for window range scans: `{ts:020}:{attempt_id}`.
pub fn attempt_time_key(timestamp_ms: i64, attempt_id: &str) -> String {
    format!("{:020}:{}", timestamp_ms.max(0) as u64, attempt_id)
}

pub fn attempt_time_bound(timestamp_ms: i64) -> String {
    format!("{:020}", timestamp_ms.max(0) as u64)
}

pub fn answer_key(user_id: &str, timestamp_ms: i64, answer_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{}:{:020}:{}", user_id, reverse_ts, answer_id)
}

pub fn answer_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

pub fn quest_progress_key(user_id: &str, quest_id: &str) -> String {
    format!("{}:{}", user_id, quest_id)
}

pub fn quest_progress_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

/// One anchor per (user, calendar day) by key construction.
pub fn day_anchor_key(user_id: &str, date: NaiveDate) -> String {
    format!("{}:{}", user_id, date.format("%Y-%m-%d"))
}

pub fn feedback_key(user_id: &str, timestamp_ms: i64, feedback_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{}:{:020}:{}", user_id, reverse_ts, feedback_id)
}

pub fn feedback_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

pub fn batch_job_key(timestamp_ms: i64, job_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{:020}:{}", reverse_ts, job_id)
}
