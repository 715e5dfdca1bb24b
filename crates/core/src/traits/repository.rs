//! 数据仓储层接口定义
//!
//! 每个仓储只负责一类实体：
//! - `WorkItemRepository` - 审核记录
//! - `WorkspaceRepository` - 工作空间、搜索规则与频道
//! - `AutoPushConfigRepository` - 自动推送配置
//! - `PushRecordRepository` - 推送记录
//! - `TagConfigRepository` - 标签映射配置
//!
//! 所有实现都必须是 `Send + Sync`，以便在调度任务之间共享。

use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{
    AutoPushConfig, AutoPushStatus, Channel, Page, PushRecord, SearchRule, StatusStatistics,
    TagConfig, WorkItem, WorkItemStatus, Workspace,
};
use crate::CuratorResult;

/// 审核记录仓储接口
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    async fn create(&self, item: &WorkItem) -> CuratorResult<WorkItem>;

    /// 批量创建 WAIT 状态的记录，返回创建数量
    ///
    /// `entries` 为 (作品ID, 作者ID) 列表
    async fn create_pending(
        &self,
        workspace_id: i64,
        site_key: &str,
        entries: &[(i64, Option<i64>)],
        created_by: Option<i64>,
    ) -> CuratorResult<u64>;

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<WorkItem>>;

    async fn find(
        &self,
        workspace_id: i64,
        site_key: &str,
        artwork_id: i64,
    ) -> CuratorResult<Option<WorkItem>>;

    /// 按作品ID查找所有工作空间中的记录
    async fn list_by_artwork_id(&self, artwork_id: i64) -> CuratorResult<Vec<WorkItem>>;

    async fn update(&self, item: &WorkItem) -> CuratorResult<()>;

    async fn delete(&self, id: i64) -> CuratorResult<()>;

    /// 按ID升序分页列出指定状态的记录ID
    async fn list_ids_by_status(
        &self,
        workspace_id: i64,
        status: WorkItemStatus,
        page: Page,
    ) -> CuratorResult<Vec<i64>>;

    /// 按ID升序分页列出工作空间在某站点下已知的作品ID
    async fn list_artwork_ids(
        &self,
        workspace_id: i64,
        site_key: &str,
        page: Page,
    ) -> CuratorResult<Vec<i64>>;

    /// 统计同一作者的 PASS/REJECT 数量
    async fn status_statistics(
        &self,
        workspace_id: i64,
        site_key: &str,
        author_id: i64,
    ) -> CuratorResult<StatusStatistics>;

    async fn count_by_status(
        &self,
        workspace_id: i64,
        status: WorkItemStatus,
    ) -> CuratorResult<u64>;
}

/// 工作空间仓储接口
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn create(&self, workspace: &Workspace) -> CuratorResult<Workspace>;

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<Workspace>>;

    async fn get_rule(&self, workspace_id: i64) -> CuratorResult<Option<SearchRule>>;

    /// 每个工作空间至多一条规则，已存在时覆盖
    async fn save_rule(&self, rule: &SearchRule) -> CuratorResult<SearchRule>;

    async fn list_channels(&self, workspace_id: i64) -> CuratorResult<Vec<Channel>>;

    async fn add_channel(&self, workspace_id: i64, channel_id: i64) -> CuratorResult<Channel>;
}

/// 自动推送配置仓储接口
#[async_trait]
pub trait AutoPushConfigRepository: Send + Sync {
    async fn create(&self, config: &AutoPushConfig) -> CuratorResult<AutoPushConfig>;

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<AutoPushConfig>>;

    async fn update(&self, config: &AutoPushConfig) -> CuratorResult<()>;

    async fn delete(&self, id: i64) -> CuratorResult<bool>;

    async fn list_by_status(&self, status: AutoPushStatus) -> CuratorResult<Vec<AutoPushConfig>>;

    async fn list_by_workspace(&self, workspace_id: i64) -> CuratorResult<Vec<AutoPushConfig>>;
}

/// 推送记录仓储接口
#[async_trait]
pub trait PushRecordRepository: Send + Sync {
    async fn get_by_review_id(&self, review_id: i64) -> CuratorResult<Option<PushRecord>>;

    /// 按审核记录ID写入或覆盖推送记录
    async fn upsert(&self, record: &PushRecord) -> CuratorResult<PushRecord>;

    /// 返回给定审核记录中已成功推送的那部分
    async fn delivered_review_ids(&self, review_ids: &[i64]) -> CuratorResult<HashSet<i64>>;
}

/// 标签映射配置仓储接口
#[async_trait]
pub trait TagConfigRepository: Send + Sync {
    async fn create(&self, config: &TagConfig) -> CuratorResult<TagConfig>;

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<TagConfig>>;

    async fn update(&self, config: &TagConfig) -> CuratorResult<()>;

    async fn delete(&self, id: i64) -> CuratorResult<bool>;

    /// `workspace_id` 为空时列出全局配置
    async fn list_by_workspace(&self, workspace_id: Option<i64>) -> CuratorResult<Vec<TagConfig>>;

    /// 工作空间内优先级最高的启用配置
    async fn get_active(&self, workspace_id: Option<i64>) -> CuratorResult<Option<TagConfig>>;

    async fn get_global_default(&self) -> CuratorResult<Option<TagConfig>>;

    /// 把指定配置设为唯一的全局默认配置
    async fn set_global_default(&self, id: i64) -> CuratorResult<bool>;
}
