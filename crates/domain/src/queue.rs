//! 同步与队列引擎
//!
//! 负责把站点上符合规则的作品同步为审核记录，并维护两个待处理集合：
//! 待审核集合与待推送集合。集合只保存审核记录ID，取出后总是重新读取记录。

use std::sync::Arc;

use curator_core::{
    config::AutoPushSettings, CuratorError, CuratorResult, Page, PushRecordRepository,
    SearchRule, SetStore, SiteService, WorkItem, WorkItemRepository, WorkItemStatus,
    WorkspaceRepository,
};
use tracing::{debug, info, instrument, warn};

use crate::keys;
use crate::sites::SitesManager;

/// 分页参数
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub candidate_page_size: u32,
    pub known_page_size: u32,
    pub review_page_size: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from(&AutoPushSettings::default())
    }
}

impl From<&AutoPushSettings> for QueueSettings {
    fn from(settings: &AutoPushSettings) -> Self {
        Self {
            candidate_page_size: settings.candidate_page_size,
            known_page_size: settings.known_page_size,
            review_page_size: settings.review_page_size,
        }
    }
}

/// 从待推送集合取出的一条已通过记录
#[derive(Clone)]
pub struct PushContext {
    pub item: WorkItem,
    pub site: Arc<dyn SiteService>,
}

pub struct QueueEngine {
    work_items: Arc<dyn WorkItemRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
    push_records: Arc<dyn PushRecordRepository>,
    sets: Arc<dyn SetStore>,
    sites: SitesManager,
    settings: QueueSettings,
}

impl QueueEngine {
    pub fn new(
        work_items: Arc<dyn WorkItemRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        push_records: Arc<dyn PushRecordRepository>,
        sets: Arc<dyn SetStore>,
        sites: SitesManager,
    ) -> Self {
        Self {
            work_items,
            workspaces,
            push_records,
            sets,
            sites,
            settings: QueueSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: QueueSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sites(&self) -> &SitesManager {
        &self.sites
    }

    /// 同步所有站点的候选作品，返回新建的审核记录数
    ///
    /// 工作空间没有搜索规则时返回 `RuleNotConfigured`，不做任何修改。
    #[instrument(skip(self))]
    pub async fn reconcile(&self, workspace_id: i64, created_by: Option<i64>) -> CuratorResult<u64> {
        let rule = self
            .workspaces
            .get_rule(workspace_id)
            .await?
            .ok_or(CuratorError::RuleNotConfigured {
                work_id: workspace_id,
            })?;

        let mut total = 0;
        for site in self.sites.all() {
            total += self
                .reconcile_site(workspace_id, site.as_ref(), &rule, created_by)
                .await?;
        }
        info!("工作空间 {} 同步完成，新增 {} 条审核记录", workspace_id, total);
        Ok(total)
    }

    async fn reconcile_site(
        &self,
        workspace_id: i64,
        site: &dyn SiteService,
        rule: &SearchRule,
        created_by: Option<i64>,
    ) -> CuratorResult<u64> {
        let site_key = site.site_key();
        let candidates_key = keys::candidates(workspace_id, site_key);
        let known_key = keys::known(workspace_id, site_key);

        self.sets.delete(&candidates_key).await?;
        self.sets.delete(&known_key).await?;

        let result = self
            .diff_and_create(workspace_id, site, rule, &candidates_key, &known_key, created_by)
            .await;

        // 临时集合无论成败都要清理
        if let Err(e) = self.sets.delete(&candidates_key).await {
            warn!("清理候选集合 {} 失败: {}", candidates_key, e);
        }
        if let Err(e) = self.sets.delete(&known_key).await {
            warn!("清理已知集合 {} 失败: {}", known_key, e);
        }

        result
    }

    async fn diff_and_create(
        &self,
        workspace_id: i64,
        site: &dyn SiteService,
        rule: &SearchRule,
        candidates_key: &str,
        known_key: &str,
        created_by: Option<i64>,
    ) -> CuratorResult<u64> {
        let mut page = Page::first(self.settings.candidate_page_size);
        loop {
            let ids = site.search_artwork_ids(rule, page).await?;
            if ids.is_empty() {
                break;
            }
            self.sets.add(candidates_key, &ids).await?;
            if ids.len() < page.size as usize {
                break;
            }
            page = page.next();
        }

        let mut page = Page::first(self.settings.known_page_size);
        loop {
            let ids = self
                .work_items
                .list_artwork_ids(workspace_id, site.site_key(), page)
                .await?;
            if ids.is_empty() {
                break;
            }
            self.sets.add(known_key, &ids).await?;
            if ids.len() < page.size as usize {
                break;
            }
            page = page.next();
        }

        let mut needed = self.sets.difference(candidates_key, known_key).await?;
        if needed.is_empty() {
            debug!("工作空间 {} 站点 {} 没有新作品", workspace_id, site.site_key());
            return Ok(0);
        }
        needed.sort_unstable();

        for chunk in needed.chunks(self.settings.candidate_page_size.max(1) as usize) {
            let authors = site.author_ids(chunk).await?;
            let entries: Vec<(i64, Option<i64>)> = chunk
                .iter()
                .map(|id| (*id, authors.get(id).copied()))
                .collect();
            self.work_items
                .create_pending(workspace_id, site.site_key(), &entries, created_by)
                .await?;
        }

        info!(
            "工作空间 {} 站点 {} 新增 {} 个待审核作品",
            workspace_id,
            site.site_key(),
            needed.len()
        );
        Ok(needed.len() as u64)
    }

    /// 把所有 WAIT 记录加入待审核集合，返回新加入的数量
    #[instrument(skip(self))]
    pub async fn enqueue_pending(&self, workspace_id: i64) -> CuratorResult<u64> {
        let key = keys::pending_review(workspace_id);
        let mut count = 0;
        let mut page = Page::first(self.settings.review_page_size);
        loop {
            let ids = self
                .work_items
                .list_ids_by_status(workspace_id, WorkItemStatus::Wait, page)
                .await?;
            if ids.is_empty() {
                break;
            }
            count += self.sets.add(&key, &ids).await?;
            if ids.len() < page.size as usize {
                break;
            }
            page = page.next();
        }
        debug!("工作空间 {} 加入待审核集合 {} 条", workspace_id, count);
        Ok(count)
    }

    /// 取出一条待审核记录，记录已被删除时跳过
    pub async fn dequeue_for_review(&self, workspace_id: i64) -> CuratorResult<Option<WorkItem>> {
        let key = keys::pending_review(workspace_id);
        while let Some(review_id) = self.sets.pop(&key).await? {
            match self.work_items.get_by_id(review_id).await? {
                Some(item) => return Ok(Some(item)),
                None => warn!("待审核记录 {} 已不存在，跳过", review_id),
            }
        }
        Ok(None)
    }

    pub async fn pending_review_count(&self, workspace_id: i64) -> CuratorResult<u64> {
        self.sets.size(&keys::pending_review(workspace_id)).await
    }

    pub async fn clear_pending_review(&self, workspace_id: i64) -> CuratorResult<()> {
        self.sets.delete(&keys::pending_review(workspace_id)).await
    }

    pub async fn enqueue_for_push(&self, workspace_id: i64, review_ids: &[i64]) -> CuratorResult<u64> {
        self.sets
            .add(&keys::pending_push(workspace_id), review_ids)
            .await
    }

    /// 取出一条仍处于 PASS 状态的待推送记录
    ///
    /// 取出后状态已变化（例如被撤回）的记录直接丢弃，不会重新入队。
    /// 站点未注册的记录留在待推送集合中，等站点可用后再推送。
    pub async fn dequeue_for_push(&self, workspace_id: i64) -> CuratorResult<Option<PushContext>> {
        let key = keys::pending_push(workspace_id);
        let mut deferred = Vec::new();
        let mut found = None;
        while let Some(review_id) = self.sets.pop(&key).await? {
            let Some(item) = self.work_items.get_by_id(review_id).await? else {
                warn!("待推送记录 {} 已不存在，丢弃", review_id);
                continue;
            };
            if item.status != WorkItemStatus::Pass {
                debug!("待推送记录 {} 当前状态为 {}，丢弃", review_id, item.status);
                continue;
            }
            match self.sites.get(&item.site_key) {
                Ok(site) => {
                    found = Some(PushContext { item, site });
                    break;
                }
                Err(e) => {
                    warn!("待推送记录 {} 暂时无法推送，保留在队列中: {}", review_id, e);
                    deferred.push(review_id);
                }
            }
        }

        if !deferred.is_empty() {
            self.sets.add(&key, &deferred).await?;
        }
        Ok(found)
    }

    /// 把记录放回待推送集合
    pub async fn undo_push(&self, workspace_id: i64, review_id: i64) -> CuratorResult<()> {
        self.sets
            .add(&keys::pending_push(workspace_id), &[review_id])
            .await?;
        Ok(())
    }

    pub async fn remove_from_pending_push(&self, workspace_id: i64, review_id: i64) -> CuratorResult<bool> {
        let removed = self
            .sets
            .remove(&keys::pending_push(workspace_id), &[review_id])
            .await?;
        Ok(removed > 0)
    }

    pub async fn pending_push_count(&self, workspace_id: i64) -> CuratorResult<u64> {
        self.sets.size(&keys::pending_push(workspace_id)).await
    }

    /// 把所有已通过但没有成功推送记录的审核记录加入待推送集合
    #[instrument(skip(self))]
    pub async fn load_pending_push_from_history(&self, workspace_id: i64) -> CuratorResult<u64> {
        let key = keys::pending_push(workspace_id);
        let mut count = 0;
        let mut page = Page::first(self.settings.review_page_size);
        loop {
            let ids = self
                .work_items
                .list_ids_by_status(workspace_id, WorkItemStatus::Pass, page)
                .await?;
            if ids.is_empty() {
                break;
            }
            let delivered = self.push_records.delivered_review_ids(&ids).await?;
            let pending: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !delivered.contains(id))
                .collect();
            count += self.sets.add(&key, &pending).await?;
            if ids.len() < page.size as usize {
                break;
            }
            page = page.next();
        }
        info!("工作空间 {} 从历史记录加载 {} 条待推送", workspace_id, count);
        Ok(count)
    }
}
