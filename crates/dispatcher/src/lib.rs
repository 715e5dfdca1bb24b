pub mod admin;
pub mod captions;
pub mod cron_utils;
pub mod job;
pub mod running;

pub use admin::AutoPushConfigService;
pub use cron_utils::CronScheduler;
pub use job::{AutoPushJob, JobSettings, RunSummary};
pub use running::{RunningConfigs, RunningGuard};
