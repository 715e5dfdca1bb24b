use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CuratorError;

/// 推送模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AutoPushMode {
    /// 先审核满一批，再统一推送
    #[serde(rename = "BATCH")]
    Batch,
    /// 逐个审核，通过即推送
    #[serde(rename = "IMMEDIATE")]
    Immediate,
}

impl AutoPushMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoPushMode::Batch => "BATCH",
            AutoPushMode::Immediate => "IMMEDIATE",
        }
    }
}

impl fmt::Display for AutoPushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoPushMode {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BATCH" => Ok(AutoPushMode::Batch),
            "IMMEDIATE" => Ok(AutoPushMode::Immediate),
            _ => Err(CuratorError::Serialization(format!("未知的推送模式: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AutoPushStatus {
    #[serde(rename = "ENABLED")]
    Enabled,
    #[serde(rename = "DISABLED")]
    Disabled,
    #[serde(rename = "PAUSED")]
    Paused,
    #[serde(rename = "RUNNING")]
    Running,
}

impl AutoPushStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoPushStatus::Enabled => "ENABLED",
            AutoPushStatus::Disabled => "DISABLED",
            AutoPushStatus::Paused => "PAUSED",
            AutoPushStatus::Running => "RUNNING",
        }
    }
}

impl fmt::Display for AutoPushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoPushStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(AutoPushStatus::Enabled),
            "DISABLED" => Ok(AutoPushStatus::Disabled),
            "PAUSED" => Ok(AutoPushStatus::Paused),
            "RUNNING" => Ok(AutoPushStatus::Running),
            _ => Err(CuratorError::Serialization(format!("未知的配置状态: {s}"))),
        }
    }
}

/// 自动推送配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoPushConfig {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub mode: AutoPushMode,
    pub status: AutoPushStatus,
    pub cron_expression: String,
    /// 每次运行处理的审核数量上限
    pub review_count: u32,
    /// 是否同时推送一份给所有者
    pub push_to_owner: bool,
    pub run_once: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
    pub last_run_time: Option<DateTime<Utc>>,
    pub next_run_time: Option<DateTime<Utc>>,
}

impl AutoPushConfig {
    /// 新建的配置默认处于禁用状态
    pub fn new(
        workspace_id: i64,
        name: impl Into<String>,
        mode: AutoPushMode,
        cron_expression: impl Into<String>,
        review_count: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            workspace_id,
            name: name.into(),
            description: None,
            mode,
            status: AutoPushStatus::Disabled,
            cron_expression: cron_expression.into(),
            review_count,
            push_to_owner: false,
            run_once: false,
            created_by: None,
            created_at: now,
            updated_by: None,
            updated_at: now,
            last_run_time: None,
            next_run_time: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == AutoPushStatus::Enabled
            && self.next_run_time.map(|next| next <= now).unwrap_or(false)
    }

    pub fn set_status(&mut self, status: AutoPushStatus, updated_by: Option<i64>) {
        self.status = status;
        self.updated_by = updated_by;
        self.updated_at = Utc::now();
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = AutoPushStatus::Running;
        self.last_run_time = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_config_is_disabled() {
        let config = AutoPushConfig::new(1, "nightly", AutoPushMode::Batch, "0 0 * * *", 20);
        assert_eq!(config.status, AutoPushStatus::Disabled);
        assert!(!config.is_due(Utc::now()));
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut config = AutoPushConfig::new(1, "n", AutoPushMode::Immediate, "* * * * *", 1);
        config.status = AutoPushStatus::Enabled;
        config.next_run_time = Some(now - Duration::seconds(1));
        assert!(config.is_due(now));

        config.next_run_time = Some(now + Duration::minutes(1));
        assert!(!config.is_due(now));

        config.next_run_time = None;
        assert!(!config.is_due(now));

        config.next_run_time = Some(now);
        config.status = AutoPushStatus::Paused;
        assert!(!config.is_due(now));
    }

    #[test]
    fn test_mark_running() {
        let now = Utc::now();
        let mut config = AutoPushConfig::new(1, "n", AutoPushMode::Batch, "* * * * *", 1);
        config.mark_running(now);
        assert_eq!(config.status, AutoPushStatus::Running);
        assert_eq!(config.last_run_time, Some(now));
        assert_eq!("RUNNING".parse::<AutoPushStatus>().unwrap(), AutoPushStatus::Running);
    }
}
