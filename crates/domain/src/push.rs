use std::sync::Arc;

use chrono::Utc;
use curator_core::{CuratorResult, PushRecord, PushRecordRepository};
use tracing::debug;

/// 推送记录服务
pub struct PushService {
    push_records: Arc<dyn PushRecordRepository>,
}

impl PushService {
    pub fn new(push_records: Arc<dyn PushRecordRepository>) -> Self {
        Self { push_records }
    }

    /// 记录一次推送结果，同一审核记录只保留一条推送记录
    pub async fn record_delivery(
        &self,
        review_id: i64,
        channel_id: i64,
        message_id: Option<i64>,
        success: bool,
        operator: Option<i64>,
    ) -> CuratorResult<PushRecord> {
        let record = match self.push_records.get_by_review_id(review_id).await? {
            Some(mut existing) => {
                existing.channel_id = channel_id;
                existing.message_id = message_id;
                existing.status = success;
                existing.updated_by = operator;
                existing.updated_at = Utc::now();
                existing
            }
            None => {
                let mut record = PushRecord::new(review_id, channel_id, message_id, success);
                record.created_by = operator;
                record.updated_by = operator;
                record
            }
        };
        debug!(
            "记录推送结果: review={} channel={} success={}",
            review_id, channel_id, success
        );
        self.push_records.upsert(&record).await
    }

    pub async fn get(&self, review_id: i64) -> CuratorResult<Option<PushRecord>> {
        self.push_records.get_by_review_id(review_id).await
    }
}
