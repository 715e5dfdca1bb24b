use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 审核记录到频道的推送记录，每个审核记录至多一条
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushRecord {
    pub id: i64,
    pub review_id: i64,
    pub channel_id: i64,
    pub message_id: Option<i64>,
    /// 是否推送成功
    pub status: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl PushRecord {
    pub fn new(review_id: i64, channel_id: i64, message_id: Option<i64>, status: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            review_id,
            channel_id,
            message_id,
            status,
            created_by: None,
            created_at: now,
            updated_by: None,
            updated_at: now,
        }
    }
}
