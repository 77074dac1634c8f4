pub mod answers;
pub mod attempts;
pub mod batch_jobs;
pub mod feedback;
pub mod progress;
pub mod quests;
