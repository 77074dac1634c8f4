use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use chrono::FixedOffset;

use crate::analytics::growth::GrowthStageConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub prompts_path: String,
    pub oracle: OracleConfig,
    pub batch: BatchConfig,
    pub growth: GrowthStageConfig,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub health_timeout_secs: u64,
}

/// Recurrence spec for a single scheduled job. `day_of_week` uses cron
/// convention (0 = Sunday); `day_of_month` is 1-based.
#[derive(Debug, Clone)]
pub struct JobSchedule {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
    pub day_of_week: Option<u8>,
    pub day_of_month: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Local timezone of the user base, as a fixed UTC offset in hours.
    pub tz_offset_hours: i8,
    pub batch_size: usize,
    pub pause_ms: u64,
    pub autostart: bool,
    pub daily_feedback: JobSchedule,
    pub weekly_report: JobSchedule,
    pub monthly_summary: JobSchedule,
}

impl BatchConfig {
    pub fn tz_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(i32::from(self.tz_offset_hours.clamp(-23, 23)) * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 8000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/analytics.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            prompts_path: env_or("PROMPTS_PATH", "./config/prompts.toml"),
            oracle: OracleConfig {
                base_url: env_or("ORACLE_BASE_URL", "http://localhost:11434"),
                model: env_or("ORACLE_MODEL", "gemma"),
                timeout_secs: env_or_parse("ORACLE_TIMEOUT_SECS", 30_u64),
                health_timeout_secs: env_or_parse("ORACLE_HEALTH_TIMEOUT_SECS", 5_u64),
            },
            batch: BatchConfig {
                tz_offset_hours: env_or_parse("BATCH_TZ_OFFSET_HOURS", 9_i8),
                batch_size: env_or_parse("BATCH_SIZE", 50_usize).max(1),
                pause_ms: env_or_parse("BATCH_PAUSE_MS", 100_u64),
                autostart: env_or_bool("SCHEDULER_AUTOSTART", true),
                daily_feedback: JobSchedule {
                    enabled: env_or_bool("DAILY_FEEDBACK_ENABLED", true),
                    hour: env_or_parse("DAILY_FEEDBACK_HOUR", 22_u8) % 24,
                    minute: env_or_parse("DAILY_FEEDBACK_MINUTE", 0_u8) % 60,
                    day_of_week: None,
                    day_of_month: None,
                },
                weekly_report: JobSchedule {
                    enabled: env_or_bool("WEEKLY_REPORT_ENABLED", false),
                    hour: env_or_parse("WEEKLY_REPORT_HOUR", 1_u8) % 24,
                    minute: env_or_parse("WEEKLY_REPORT_MINUTE", 0_u8) % 60,
                    day_of_week: Some(env_or_parse("WEEKLY_REPORT_DAY_OF_WEEK", 0_u8) % 7),
                    day_of_month: None,
                },
                monthly_summary: JobSchedule {
                    enabled: env_or_bool("MONTHLY_SUMMARY_ENABLED", false),
                    hour: env_or_parse("MONTHLY_SUMMARY_HOUR", 2_u8) % 24,
                    minute: env_or_parse("MONTHLY_SUMMARY_MINUTE", 0_u8) % 60,
                    day_of_week: None,
                    day_of_month: Some(env_or_parse("MONTHLY_SUMMARY_DAY", 1_u8).clamp(1, 28)),
                },
            },
            growth: GrowthStageConfig {
                sprout_min_order: env_or_parse("GROWTH_SPROUT_MIN_ORDER", 2_u16),
                growing_min_order: env_or_parse("GROWTH_GROWING_MIN_ORDER", 5_u16),
                fruit_min_order: env_or_parse("GROWTH_FRUIT_MIN_ORDER", 8_u16),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
