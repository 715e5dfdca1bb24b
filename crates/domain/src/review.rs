//! 审核服务：自动审核判定与操作员的审核操作

use std::sync::Arc;

use curator_core::{
    AutoReviewDecision, AutoReviewResult, CuratorError, CuratorResult, StatusStatistics,
    WorkItem, WorkItemRepository, WorkItemStatus, WorkspaceRepository,
};
use tracing::{debug, info, instrument};

use crate::queue::QueueEngine;

/// 自动审核至少需要的历史结论数
pub const MIN_DECIDED: u64 = 3;

/// 判定为通过的最低通过率
pub const PASS_RATIO: f64 = 0.5;

/// 根据作者历史结论给出判定，历史不足时返回 None
pub fn decide(statistics: StatusStatistics) -> Option<AutoReviewResult> {
    let decided = statistics.total();
    if decided < MIN_DECIDED {
        return None;
    }
    let ratio = statistics.pass_count as f64 / decided as f64;
    let decision = if ratio >= PASS_RATIO {
        AutoReviewDecision::Pass
    } else {
        AutoReviewDecision::Reject
    };
    Some(AutoReviewResult {
        decision,
        statistics,
    })
}

pub struct ReviewService {
    work_items: Arc<dyn WorkItemRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
    queue: Arc<QueueEngine>,
}

impl ReviewService {
    pub fn new(
        work_items: Arc<dyn WorkItemRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        queue: Arc<QueueEngine>,
    ) -> Self {
        Self {
            work_items,
            workspaces,
            queue,
        }
    }

    pub fn queue(&self) -> &Arc<QueueEngine> {
        &self.queue
    }

    /// 尝试根据作者在工作空间内的历史结论自动审核
    pub async fn try_auto_review(
        &self,
        workspace_id: i64,
        site_key: &str,
        author_id: i64,
    ) -> CuratorResult<Option<AutoReviewResult>> {
        let statistics = self
            .work_items
            .status_statistics(workspace_id, site_key, author_id)
            .await?;
        let result = decide(statistics);
        debug!(
            "作者 {} 历史结论 {}/{}，自动审核结果 {:?}",
            author_id,
            statistics.pass_count,
            statistics.total(),
            result.map(|r| r.decision)
        );
        Ok(result)
    }

    pub async fn get(&self, review_id: i64) -> CuratorResult<WorkItem> {
        self.work_items
            .get_by_id(review_id)
            .await?
            .ok_or(CuratorError::ReviewNotFound { id: review_id })
    }

    /// 写入审核结论
    #[instrument(skip(self))]
    pub async fn set_decision(
        &self,
        review_id: i64,
        status: WorkItemStatus,
        auto: bool,
        updated_by: Option<i64>,
    ) -> CuratorResult<WorkItem> {
        let mut item = self.get(review_id).await?;
        item.transition_to(status, auto, updated_by)?;
        self.work_items.update(&item).await?;
        Ok(item)
    }

    /// 撤回结论，同时从待推送集合中移除
    #[instrument(skip(self))]
    pub async fn revert(&self, review_id: i64, updated_by: Option<i64>) -> CuratorResult<WorkItem> {
        let mut item = self.get(review_id).await?;
        item.revert(updated_by)?;
        self.work_items.update(&item).await?;
        if self
            .queue
            .remove_from_pending_push(item.workspace_id, item.id)
            .await?
        {
            info!("审核记录 {} 已撤回并移出待推送集合", item.id);
        }
        Ok(item)
    }

    /// 把记录移动到另一个工作空间，返回目标工作空间中的记录
    #[instrument(skip(self))]
    pub async fn move_to(
        &self,
        review_id: i64,
        target_workspace_id: i64,
        updated_by: Option<i64>,
    ) -> CuratorResult<WorkItem> {
        if self
            .workspaces
            .get_by_id(target_workspace_id)
            .await?
            .is_none()
        {
            return Err(CuratorError::WorkNotFound {
                id: target_workspace_id,
            });
        }

        let mut item = self.get(review_id).await?;
        let previous = item.status;
        item.mark_moved(target_workspace_id, updated_by)?;
        self.work_items.update(&item).await?;
        self.queue
            .remove_from_pending_push(item.workspace_id, item.id)
            .await?;

        if let Some(mut existing) = self
            .work_items
            .find(target_workspace_id, &item.site_key, item.artwork_id)
            .await?
        {
            if existing.status == WorkItemStatus::Move {
                debug!(
                    "作品 {} 移回工作空间 {}，恢复原记录",
                    item.artwork_id, target_workspace_id
                );
                existing.restore_moved(previous, item.auto, item.workspace_id, updated_by);
                self.work_items.update(&existing).await?;
            } else {
                debug!("目标工作空间已存在作品 {} 的记录", item.artwork_id);
            }
            return Ok(existing);
        }

        let copy = item.copy_for_move(target_workspace_id, previous, updated_by);
        self.work_items.create(&copy).await
    }

    pub async fn remove(&self, review_id: i64) -> CuratorResult<()> {
        let item = self.get(review_id).await?;
        self.work_items.delete(review_id).await?;
        self.queue
            .remove_from_pending_push(item.workspace_id, review_id)
            .await?;
        Ok(())
    }

    /// 操作员直接为作品写入结论，记录不存在时新建
    ///
    /// 已有 PASS/REJECT 结论的记录会先撤回再写入。
    #[instrument(skip(self))]
    pub async fn record_manual_decision(
        &self,
        workspace_id: i64,
        site_key: &str,
        artwork_id: i64,
        status: WorkItemStatus,
        created_by: Option<i64>,
    ) -> CuratorResult<WorkItem> {
        match self
            .work_items
            .find(workspace_id, site_key, artwork_id)
            .await?
        {
            Some(mut item) => {
                if matches!(item.status, WorkItemStatus::Pass | WorkItemStatus::Reject)
                    && item.status != status
                {
                    item.revert(created_by)?;
                }
                item.transition_to(status, false, created_by)?;
                self.work_items.update(&item).await?;
                Ok(item)
            }
            None => {
                let mut item = WorkItem::new(workspace_id, site_key, artwork_id, None, created_by);
                item.transition_to(status, false, created_by)?;
                self.work_items.create(&item).await
            }
        }
    }

    pub async fn find_by_artwork_id(&self, artwork_id: i64) -> CuratorResult<Vec<WorkItem>> {
        self.work_items.list_by_artwork_id(artwork_id).await
    }

    pub async fn count_by_status(&self, workspace_id: i64, status: WorkItemStatus) -> CuratorResult<u64> {
        self.work_items.count_by_status(workspace_id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pass: u64, reject: u64) -> StatusStatistics {
        StatusStatistics {
            pass_count: pass,
            reject_count: reject,
        }
    }

    #[test]
    fn test_decide_needs_three_decisions() {
        assert!(decide(stats(0, 0)).is_none());
        assert!(decide(stats(2, 0)).is_none());
        assert!(decide(stats(1, 1)).is_none());
    }

    #[test]
    fn test_decide_ratio_boundary() {
        assert_eq!(decide(stats(2, 2)).unwrap().decision, AutoReviewDecision::Pass);
        assert_eq!(decide(stats(3, 0)).unwrap().decision, AutoReviewDecision::Pass);
        assert_eq!(decide(stats(1, 2)).unwrap().decision, AutoReviewDecision::Reject);
        assert_eq!(decide(stats(0, 3)).unwrap().decision, AutoReviewDecision::Reject);
    }

    #[test]
    fn test_decide_keeps_statistics() {
        let result = decide(stats(4, 1)).unwrap();
        assert_eq!(result.statistics.total(), 5);
    }
}
