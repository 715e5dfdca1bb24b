use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 标签映射配置，指向磁盘上的一个名称映射数据集
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagConfig {
    pub id: i64,
    /// 为空表示全局配置
    pub workspace_id: Option<i64>,
    pub config_key: String,
    /// 相对于名称映射根目录的路径，为空时使用 `{dir}/{config_key}.json`
    pub file_path: Option<String>,
    pub description: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    pub is_global_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagConfig {
    pub fn new(workspace_id: Option<i64>, config_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            workspace_id,
            config_key: config_key.into(),
            file_path: None,
            description: None,
            priority: 0,
            is_active: true,
            is_global_default: false,
            created_at: now,
            updated_at: now,
        }
    }
}
