pub mod artwork;
pub mod auto_push;
pub mod push_record;
pub mod tag_config;
pub mod work_item;
pub mod workspace;

pub use artwork::{Artwork, Author, MediaBlob, MediaKind};
pub use auto_push::{AutoPushConfig, AutoPushMode, AutoPushStatus};
pub use push_record::PushRecord;
pub use tag_config::TagConfig;
pub use work_item::{
    AutoReviewDecision, AutoReviewResult, StatusStatistics, WorkItem, WorkItemStatus,
};
pub use workspace::{Channel, SearchRule, Workspace};

/// 分页参数，页码从1开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size,
        }
    }

    pub fn first(size: u32) -> Self {
        Self::new(1, size)
    }

    pub fn next(&self) -> Self {
        Self::new(self.number + 1, self.size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}
