pub const QUESTS: &str = "quests";
pub const QUEST_TAGS: &str = "quest_tags";
pub const ATTEMPTS: &str = "attempts";
pub const ATTEMPTS_BY_TIME: &str = "attempts_by_time";
pub const ANSWERS: &str = "answers";
pub const QUEST_PROGRESS: &str = "quest_progress";
pub const DAY_ANCHORS: &str = "day_anchors";
pub const FEEDBACKS: &str = "feedbacks";
pub const BATCH_JOBS: &str = "batch_jobs";
