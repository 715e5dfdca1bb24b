use thiserror::Error;

/// 审核系统错误类型定义
#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("集合存储错误: {0}")]
    Cache(String),

    #[error("工作空间未找到: {id}")]
    WorkNotFound { id: i64 },

    #[error("审核记录未找到: {id}")]
    ReviewNotFound { id: i64 },

    #[error("自动推送配置未找到: {id}")]
    ConfigNotFound { id: i64 },

    #[error("标签配置未找到: {id}")]
    TagConfigNotFound { id: i64 },

    #[error("工作空间 {work_id} 未配置搜索规则")]
    RuleNotConfigured { work_id: i64 },

    #[error("工作空间 {work_id} 未配置推送频道")]
    ChannelNotConfigured { work_id: i64 },

    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    #[error("无效的状态转换: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("作品未找到: {site_key}/{artwork_id}")]
    ArtworkNotFound { site_key: String, artwork_id: i64 },

    #[error("站点未注册: {0}")]
    SiteNotFound(String),

    #[error("推送被限流, {retry_after_secs} 秒后重试")]
    RateLimited { retry_after_secs: u64 },

    #[error("推送网络错误: {0}")]
    Delivery(String),

    #[error("推送被拒绝: {0}")]
    DeliveryRejected(String),

    #[error("标签映射错误: {0}")]
    NameMap(String),

    #[error("无效的正则表达式: {pattern} - {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl CuratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CuratorError::WorkNotFound { .. }
                | CuratorError::ReviewNotFound { .. }
                | CuratorError::ConfigNotFound { .. }
                | CuratorError::TagConfigNotFound { .. }
                | CuratorError::ArtworkNotFound { .. }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CuratorError::RateLimited { .. })
    }

    /// 限流错误携带的等待秒数
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            CuratorError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// 网络层面的推送失败，可以重试
    pub fn is_transient_delivery(&self) -> bool {
        matches!(self, CuratorError::Delivery(_))
    }
}

impl From<serde_json::Error> for CuratorError {
    fn from(err: serde_json::Error) -> Self {
        CuratorError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type CuratorResult<T> = std::result::Result<T, CuratorError>;
