use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: impl Into<String>, created_by: Option<i64>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// 工作空间的作品搜索规则，由站点负责解释
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRule {
    pub id: i64,
    pub workspace_id: i64,
    pub search_text: String,
    pub is_pattern: bool,
    pub description: Option<String>,
}

impl SearchRule {
    pub fn new(workspace_id: i64, search_text: impl Into<String>) -> Self {
        Self {
            id: 0,
            workspace_id,
            search_text: search_text.into(),
            is_pattern: false,
            description: None,
        }
    }
}

/// 工作空间绑定的推送频道
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub workspace_id: i64,
    pub channel_id: i64,
}
