use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CuratorError, CuratorResult};

/// 审核记录状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkItemStatus {
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "REJECT")]
    Reject,
    #[serde(rename = "MOVE")]
    Move,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERROR")]
    Error,
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::Wait => "WAIT",
            WorkItemStatus::Pass => "PASS",
            WorkItemStatus::Reject => "REJECT",
            WorkItemStatus::Move => "MOVE",
            WorkItemStatus::NotFound => "NOT_FOUND",
            WorkItemStatus::Error => "ERROR",
        }
    }

    /// WAIT 可以转到任意状态，PASS/REJECT 只能撤回到 WAIT，其余状态终结
    pub fn can_transition_to(&self, next: WorkItemStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            WorkItemStatus::Wait => true,
            WorkItemStatus::Pass | WorkItemStatus::Reject => {
                matches!(next, WorkItemStatus::Wait | WorkItemStatus::Move)
            }
            _ => false,
        }
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAIT" => Ok(WorkItemStatus::Wait),
            "PASS" => Ok(WorkItemStatus::Pass),
            "REJECT" => Ok(WorkItemStatus::Reject),
            "MOVE" => Ok(WorkItemStatus::Move),
            "NOT_FOUND" => Ok(WorkItemStatus::NotFound),
            "ERROR" => Ok(WorkItemStatus::Error),
            _ => Err(CuratorError::Serialization(format!("未知的审核状态: {s}"))),
        }
    }
}

/// 工作空间内一个作品的审核记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: i64,
    pub workspace_id: i64,
    pub site_key: String,
    pub artwork_id: i64,
    pub author_id: Option<i64>,
    pub status: WorkItemStatus,
    /// 状态是否由自动审核给出
    pub auto: bool,
    pub ext: serde_json::Map<String, serde_json::Value>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(
        workspace_id: i64,
        site_key: impl Into<String>,
        artwork_id: i64,
        author_id: Option<i64>,
        created_by: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            workspace_id,
            site_key: site_key.into(),
            artwork_id,
            author_id,
            status: WorkItemStatus::Wait,
            auto: false,
            ext: serde_json::Map::new(),
            created_by,
            created_at: now,
            updated_by: created_by,
            updated_at: now,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == WorkItemStatus::Wait
    }

    /// 按状态机规则更新状态
    pub fn transition_to(
        &mut self,
        status: WorkItemStatus,
        auto: bool,
        updated_by: Option<i64>,
    ) -> CuratorResult<()> {
        if !self.status.can_transition_to(status) {
            return Err(CuratorError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.auto = auto;
        self.updated_by = updated_by;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 撤回人工或自动给出的结论
    pub fn revert(&mut self, updated_by: Option<i64>) -> CuratorResult<()> {
        self.transition_to(WorkItemStatus::Wait, false, updated_by)
    }

    /// 标记为已移动，并在扩展字段中记录目标工作空间
    pub fn mark_moved(&mut self, target_workspace_id: i64, updated_by: Option<i64>) -> CuratorResult<()> {
        let previous = self.status;
        self.transition_to(WorkItemStatus::Move, false, updated_by)?;
        self.ext
            .insert("move_to".to_string(), serde_json::Value::from(target_workspace_id));
        self.ext.insert(
            "move_from_status".to_string(),
            serde_json::Value::from(previous.as_str()),
        );
        Ok(())
    }

    /// 作品被移回时恢复之前移出的记录
    pub fn restore_moved(
        &mut self,
        status: WorkItemStatus,
        auto: bool,
        from_workspace_id: i64,
        by: Option<i64>,
    ) {
        self.status = status;
        self.auto = auto;
        self.ext.remove("move_to");
        self.ext.remove("move_from_status");
        self.ext
            .insert("move_from".to_string(), serde_json::Value::from(from_workspace_id));
        self.updated_by = by;
        self.updated_at = Utc::now();
    }

    /// 移动到目标工作空间的副本，保留移动前的结论
    pub fn copy_for_move(&self, target_workspace_id: i64, previous: WorkItemStatus, by: Option<i64>) -> Self {
        let mut copy = WorkItem::new(
            target_workspace_id,
            self.site_key.clone(),
            self.artwork_id,
            self.author_id,
            by,
        );
        copy.status = previous;
        copy.auto = self.auto;
        copy.ext
            .insert("move_from".to_string(), serde_json::Value::from(self.workspace_id));
        copy
    }
}

/// 同一作者在工作空间内的历史结论统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStatistics {
    pub pass_count: u64,
    pub reject_count: u64,
}

impl StatusStatistics {
    pub fn total(&self) -> u64 {
        self.pass_count + self.reject_count
    }
}

/// 自动审核给出的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoReviewDecision {
    Pass,
    Reject,
}

impl AutoReviewDecision {
    pub fn status(&self) -> WorkItemStatus {
        match self {
            AutoReviewDecision::Pass => WorkItemStatus::Pass,
            AutoReviewDecision::Reject => WorkItemStatus::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReviewResult {
    pub decision: AutoReviewDecision,
    pub statistics: StatusStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            WorkItemStatus::Wait,
            WorkItemStatus::Pass,
            WorkItemStatus::Reject,
            WorkItemStatus::Move,
            WorkItemStatus::NotFound,
            WorkItemStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<WorkItemStatus>().unwrap(), status);
        }
        assert!("UNKNOWN".parse::<WorkItemStatus>().is_err());
    }

    #[test]
    fn test_transitions() {
        let mut item = WorkItem::new(1, "pixiv", 100, Some(9), None);
        item.transition_to(WorkItemStatus::Pass, true, None).unwrap();
        assert!(item.auto);

        assert!(item.transition_to(WorkItemStatus::Reject, false, None).is_err());

        item.revert(Some(5)).unwrap();
        assert_eq!(item.status, WorkItemStatus::Wait);
        assert!(!item.auto);
        assert_eq!(item.updated_by, Some(5));

        item.transition_to(WorkItemStatus::NotFound, true, None).unwrap();
        assert!(item.revert(None).is_err());
    }

    #[test]
    fn test_mark_moved() {
        let mut item = WorkItem::new(1, "pixiv", 100, None, None);
        item.transition_to(WorkItemStatus::Pass, false, None).unwrap();
        item.mark_moved(2, Some(3)).unwrap();

        assert_eq!(item.status, WorkItemStatus::Move);
        assert_eq!(item.ext.get("move_to"), Some(&serde_json::Value::from(2)));

        let copy = item.copy_for_move(2, WorkItemStatus::Pass, Some(3));
        assert_eq!(copy.workspace_id, 2);
        assert_eq!(copy.status, WorkItemStatus::Pass);
        assert_eq!(copy.id, 0);
    }
}
