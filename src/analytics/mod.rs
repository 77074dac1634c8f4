pub mod batch;
pub mod confusion;
pub mod fallback;
pub mod generate;
pub mod growth;
pub mod prompt;
pub mod report;
pub mod stats;

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::analytics::growth::GrowthStageConfig;
use crate::analytics::prompt::PromptLibrary;
use crate::config::BatchConfig;
use crate::services::oracle::OracleClient;
use crate::store::Store;

/// Half-open UTC window `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The UTC window covering one calendar day in the given local offset.
    pub fn for_local_day(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start_naive_utc =
            local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
        let start = DateTime::<Utc>::from_naive_utc_and_offset(start_naive_utc, Utc);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// The UTC window covering the trailing `days` days ending now.
    pub fn trailing_days(days: u32) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }
}

pub fn local_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Owns everything one per-user feedback generation needs: store access,
/// the oracle client, prompt templates and classification thresholds.
/// Batch runs and the interactive API share the same instance.
pub struct FeedbackPipeline {
    pub(crate) store: Arc<Store>,
    pub(crate) oracle: Arc<OracleClient>,
    pub(crate) prompts: Arc<PromptLibrary>,
    pub(crate) growth: GrowthStageConfig,
    pub(crate) batch: BatchConfig,
}

impl FeedbackPipeline {
    pub fn new(
        store: Arc<Store>,
        oracle: Arc<OracleClient>,
        prompts: Arc<PromptLibrary>,
        growth: GrowthStageConfig,
        batch: BatchConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            prompts,
            growth,
            batch,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn local_today(&self) -> NaiveDate {
        local_today(self.batch.tz_offset())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_day_window_shifts_by_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let window = TimeWindow::for_local_day(date, kst);

        // Midnight KST on the 15th is 15:00 UTC on the 14th.
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 1, 14, 15, 0, 0).unwrap()
        );
        assert_eq!(window.end - window.start, Duration::days(1));
    }

    #[test]
    fn utc_offset_window_is_identity() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let window = TimeWindow::for_local_day(date, utc);
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
        );
    }
}
