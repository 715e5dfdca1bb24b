use async_trait::async_trait;

use crate::models::{MediaBlob, MediaKind};
use crate::CuratorResult;

/// 待发送的消息
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub caption: String,
    pub media: Vec<MediaBlob>,
    pub media_kind: MediaKind,
}

/// 推送目标接口
///
/// 失败时返回：
/// - `CuratorError::RateLimited` 需要等待后重试
/// - `CuratorError::Delivery` 网络错误，可以重试
/// - `CuratorError::DeliveryRejected` 目标拒绝，不应重试
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// 发送媒体消息，返回消息ID
    async fn send(&self, message: &OutgoingMessage) -> CuratorResult<i64>;

    async fn send_text(&self, chat_id: i64, text: &str) -> CuratorResult<i64>;
}
