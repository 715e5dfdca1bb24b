//! 所有仓储与外部服务接口的内存实现
//!
//! 不需要数据库或网络即可驱动队列引擎与调度器。

use async_trait::async_trait;
use chrono::Utc;
use curator_core::{
    Artwork, AutoPushConfig, AutoPushConfigRepository, AutoPushStatus, Channel, CuratorError,
    CuratorResult, DeliverySink, MediaBlob, OutgoingMessage, Page, PushRecord,
    PushRecordRepository, SearchRule, SiteService, StatusStatistics, TagConfig,
    TagConfigRepository, WorkItem, WorkItemRepository, WorkItemStatus, Workspace,
    WorkspaceRepository,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn paginate<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .cloned()
        .collect()
}

/// WorkItemRepository 的内存实现，按ID有序存储
#[derive(Debug, Clone)]
pub struct MockWorkItemRepository {
    items: Arc<Mutex<BTreeMap<i64, WorkItem>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockWorkItemRepository {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_items(items: Vec<WorkItem>) -> Self {
        let repo = Self::new();
        for item in items {
            repo.insert(item);
        }
        repo
    }

    /// 直接写入记录，id为0时自动分配
    pub fn insert(&self, mut item: WorkItem) -> WorkItem {
        let mut next_id = self.next_id.lock().unwrap();
        if item.id == 0 {
            item.id = *next_id;
        }
        *next_id = (*next_id).max(item.id + 1);
        self.items.lock().unwrap().insert(item.id, item.clone());
        item
    }

    pub fn get(&self, id: i64) -> Option<WorkItem> {
        self.items.lock().unwrap().get(&id).cloned()
    }

    /// 绕过状态机直接改写状态，模拟操作员在并发流程中的修改
    pub fn force_status(&self, id: i64, status: WorkItemStatus) {
        if let Some(item) = self.items.lock().unwrap().get_mut(&id) {
            item.status = status;
        }
    }

    pub fn all(&self) -> Vec<WorkItem> {
        self.items.lock().unwrap().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl Default for MockWorkItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkItemRepository for MockWorkItemRepository {
    async fn create(&self, item: &WorkItem) -> CuratorResult<WorkItem> {
        let mut new_item = item.clone();
        new_item.id = 0;
        Ok(self.insert(new_item))
    }

    async fn create_pending(
        &self,
        workspace_id: i64,
        site_key: &str,
        entries: &[(i64, Option<i64>)],
        created_by: Option<i64>,
    ) -> CuratorResult<u64> {
        let mut created = 0;
        for (artwork_id, author_id) in entries {
            let exists = self.items.lock().unwrap().values().any(|i| {
                i.workspace_id == workspace_id && i.site_key == site_key && i.artwork_id == *artwork_id
            });
            if !exists {
                self.insert(WorkItem::new(workspace_id, site_key, *artwork_id, *author_id, created_by));
                created += 1;
            }
        }
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<WorkItem>> {
        Ok(self.get(id))
    }

    async fn find(
        &self,
        workspace_id: i64,
        site_key: &str,
        artwork_id: i64,
    ) -> CuratorResult<Option<WorkItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .find(|i| {
                i.workspace_id == workspace_id && i.site_key == site_key && i.artwork_id == artwork_id
            })
            .cloned())
    }

    async fn list_by_artwork_id(&self, artwork_id: i64) -> CuratorResult<Vec<WorkItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.artwork_id == artwork_id)
            .cloned()
            .collect())
    }

    async fn update(&self, item: &WorkItem) -> CuratorResult<()> {
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(CuratorError::ReviewNotFound { id: item.id }),
        }
    }

    async fn delete(&self, id: i64) -> CuratorResult<()> {
        self.items
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(CuratorError::ReviewNotFound { id })
    }

    async fn list_ids_by_status(
        &self,
        workspace_id: i64,
        status: WorkItemStatus,
        page: Page,
    ) -> CuratorResult<Vec<i64>> {
        let ids: Vec<i64> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.workspace_id == workspace_id && i.status == status)
            .map(|i| i.id)
            .collect();
        Ok(paginate(&ids, page))
    }

    async fn list_artwork_ids(
        &self,
        workspace_id: i64,
        site_key: &str,
        page: Page,
    ) -> CuratorResult<Vec<i64>> {
        let ids: Vec<i64> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.workspace_id == workspace_id && i.site_key == site_key)
            .map(|i| i.artwork_id)
            .collect();
        Ok(paginate(&ids, page))
    }

    async fn status_statistics(
        &self,
        workspace_id: i64,
        site_key: &str,
        author_id: i64,
    ) -> CuratorResult<StatusStatistics> {
        let items = self.items.lock().unwrap();
        let mut stats = StatusStatistics::default();
        for item in items.values().filter(|i| {
            i.workspace_id == workspace_id && i.site_key == site_key && i.author_id == Some(author_id)
        }) {
            match item.status {
                WorkItemStatus::Pass => stats.pass_count += 1,
                WorkItemStatus::Reject => stats.reject_count += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn count_by_status(&self, workspace_id: i64, status: WorkItemStatus) -> CuratorResult<u64> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.workspace_id == workspace_id && i.status == status)
            .count() as u64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockWorkspaceRepository {
    workspaces: Arc<Mutex<HashMap<i64, Workspace>>>,
    rules: Arc<Mutex<HashMap<i64, SearchRule>>>,
    channels: Arc<Mutex<Vec<Channel>>>,
}

impl MockWorkspaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个带规则和频道的工作空间
    pub fn add_workspace(&self, id: i64, search_text: Option<&str>, channel_ids: &[i64]) {
        let mut workspace = Workspace::new(format!("workspace {id}"), None);
        workspace.id = id;
        self.workspaces.lock().unwrap().insert(id, workspace);
        if let Some(text) = search_text {
            let mut rule = SearchRule::new(id, text);
            rule.id = id;
            self.rules.lock().unwrap().insert(id, rule);
        }
        let mut channels = self.channels.lock().unwrap();
        for channel_id in channel_ids {
            let id_value = channels.len() as i64 + 1;
            channels.push(Channel {
                id: id_value,
                workspace_id: id,
                channel_id: *channel_id,
            });
        }
    }
}

#[async_trait]
impl WorkspaceRepository for MockWorkspaceRepository {
    async fn create(&self, workspace: &Workspace) -> CuratorResult<Workspace> {
        let mut workspaces = self.workspaces.lock().unwrap();
        let mut created = workspace.clone();
        created.id = workspaces.keys().max().copied().unwrap_or(0) + 1;
        workspaces.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<Workspace>> {
        Ok(self.workspaces.lock().unwrap().get(&id).cloned())
    }

    async fn get_rule(&self, workspace_id: i64) -> CuratorResult<Option<SearchRule>> {
        Ok(self.rules.lock().unwrap().get(&workspace_id).cloned())
    }

    async fn save_rule(&self, rule: &SearchRule) -> CuratorResult<SearchRule> {
        let mut saved = rule.clone();
        saved.id = rule.workspace_id;
        self.rules
            .lock()
            .unwrap()
            .insert(rule.workspace_id, saved.clone());
        Ok(saved)
    }

    async fn list_channels(&self, workspace_id: i64) -> CuratorResult<Vec<Channel>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn add_channel(&self, workspace_id: i64, channel_id: i64) -> CuratorResult<Channel> {
        let mut channels = self.channels.lock().unwrap();
        if let Some(existing) = channels
            .iter()
            .find(|c| c.workspace_id == workspace_id && c.channel_id == channel_id)
        {
            return Ok(existing.clone());
        }
        let channel = Channel {
            id: channels.len() as i64 + 1,
            workspace_id,
            channel_id,
        };
        channels.push(channel.clone());
        Ok(channel)
    }
}

#[derive(Debug, Clone)]
pub struct MockAutoPushConfigRepository {
    configs: Arc<Mutex<HashMap<i64, AutoPushConfig>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockAutoPushConfigRepository {
    pub fn new() -> Self {
        Self {
            configs: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_configs(configs: Vec<AutoPushConfig>) -> Self {
        let repo = Self::new();
        for config in configs {
            repo.insert(config);
        }
        repo
    }

    pub fn insert(&self, mut config: AutoPushConfig) -> AutoPushConfig {
        let mut next_id = self.next_id.lock().unwrap();
        if config.id == 0 {
            config.id = *next_id;
        }
        *next_id = (*next_id).max(config.id + 1);
        self.configs.lock().unwrap().insert(config.id, config.clone());
        config
    }

    pub fn get(&self, id: i64) -> Option<AutoPushConfig> {
        self.configs.lock().unwrap().get(&id).cloned()
    }

    /// 模拟操作员在运行期间修改状态
    pub fn force_status(&self, id: i64, status: AutoPushStatus) {
        if let Some(config) = self.configs.lock().unwrap().get_mut(&id) {
            config.status = status;
        }
    }
}

impl Default for MockAutoPushConfigRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutoPushConfigRepository for MockAutoPushConfigRepository {
    async fn create(&self, config: &AutoPushConfig) -> CuratorResult<AutoPushConfig> {
        let mut new_config = config.clone();
        new_config.id = 0;
        Ok(self.insert(new_config))
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<AutoPushConfig>> {
        Ok(self.get(id))
    }

    async fn update(&self, config: &AutoPushConfig) -> CuratorResult<()> {
        let mut configs = self.configs.lock().unwrap();
        match configs.get_mut(&config.id) {
            Some(existing) => {
                *existing = config.clone();
                Ok(())
            }
            None => Err(CuratorError::ConfigNotFound { id: config.id }),
        }
    }

    async fn delete(&self, id: i64) -> CuratorResult<bool> {
        Ok(self.configs.lock().unwrap().remove(&id).is_some())
    }

    async fn list_by_status(&self, status: AutoPushStatus) -> CuratorResult<Vec<AutoPushConfig>> {
        let mut configs: Vec<AutoPushConfig> = self
            .configs
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.id);
        Ok(configs)
    }

    async fn list_by_workspace(&self, workspace_id: i64) -> CuratorResult<Vec<AutoPushConfig>> {
        let mut configs: Vec<AutoPushConfig> = self
            .configs
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.id);
        Ok(configs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPushRecordRepository {
    records: Arc<Mutex<HashMap<i64, PushRecord>>>,
}

impl MockPushRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, review_id: i64) -> Option<PushRecord> {
        self.records.lock().unwrap().get(&review_id).cloned()
    }

    pub fn all(&self) -> Vec<PushRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl PushRecordRepository for MockPushRecordRepository {
    async fn get_by_review_id(&self, review_id: i64) -> CuratorResult<Option<PushRecord>> {
        Ok(self.get(review_id))
    }

    async fn upsert(&self, record: &PushRecord) -> CuratorResult<PushRecord> {
        let mut records = self.records.lock().unwrap();
        let next_id = records.len() as i64 + 1;
        let stored = match records.get(&record.review_id) {
            Some(existing) => PushRecord {
                id: existing.id,
                created_by: existing.created_by,
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..record.clone()
            },
            None => PushRecord {
                id: next_id,
                ..record.clone()
            },
        };
        records.insert(record.review_id, stored.clone());
        Ok(stored)
    }

    async fn delivered_review_ids(&self, review_ids: &[i64]) -> CuratorResult<HashSet<i64>> {
        let records = self.records.lock().unwrap();
        Ok(review_ids
            .iter()
            .filter(|id| records.get(*id).map(|r| r.status).unwrap_or(false))
            .copied()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct MockTagConfigRepository {
    configs: Arc<Mutex<BTreeMap<i64, TagConfig>>>,
    active_lookups: Arc<AtomicUsize>,
}

impl MockTagConfigRepository {
    pub fn new() -> Self {
        Self {
            configs: Arc::new(Mutex::new(BTreeMap::new())),
            active_lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `get_active` 被调用的次数
    pub fn active_lookups(&self) -> usize {
        self.active_lookups.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<TagConfig> {
        self.configs.lock().unwrap().values().cloned().collect()
    }
}

impl Default for MockTagConfigRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagConfigRepository for MockTagConfigRepository {
    async fn create(&self, config: &TagConfig) -> CuratorResult<TagConfig> {
        let mut configs = self.configs.lock().unwrap();
        let mut created = config.clone();
        created.id = configs.keys().max().copied().unwrap_or(0) + 1;
        configs.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<TagConfig>> {
        Ok(self.configs.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, config: &TagConfig) -> CuratorResult<()> {
        let mut configs = self.configs.lock().unwrap();
        match configs.get_mut(&config.id) {
            Some(existing) => {
                *existing = config.clone();
                Ok(())
            }
            None => Err(CuratorError::TagConfigNotFound { id: config.id }),
        }
    }

    async fn delete(&self, id: i64) -> CuratorResult<bool> {
        Ok(self.configs.lock().unwrap().remove(&id).is_some())
    }

    async fn list_by_workspace(&self, workspace_id: Option<i64>) -> CuratorResult<Vec<TagConfig>> {
        let mut configs: Vec<TagConfig> = self
            .configs
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect();
        configs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(configs)
    }

    async fn get_active(&self, workspace_id: Option<i64>) -> CuratorResult<Option<TagConfig>> {
        self.active_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .list_by_workspace(workspace_id)
            .await?
            .into_iter()
            .find(|c| c.is_active))
    }

    async fn get_global_default(&self) -> CuratorResult<Option<TagConfig>> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .values()
            .find(|c| c.is_global_default && c.is_active)
            .cloned())
    }

    async fn set_global_default(&self, id: i64) -> CuratorResult<bool> {
        let mut configs = self.configs.lock().unwrap();
        if !configs.contains_key(&id) {
            return Ok(false);
        }
        for config in configs.values_mut() {
            config.is_global_default = config.id == id;
        }
        Ok(true)
    }
}

/// 可编排的站点实现
///
/// 搜索规则按标签精确匹配（忽略大小写），分页按作品ID升序。
#[derive(Debug, Clone)]
pub struct MockSite {
    key: String,
    artworks: Arc<Mutex<BTreeMap<i64, Artwork>>>,
    broken: Arc<Mutex<HashSet<i64>>>,
    artwork_calls: Arc<AtomicUsize>,
}

impl MockSite {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            artworks: Arc::new(Mutex::new(BTreeMap::new())),
            broken: Arc::new(Mutex::new(HashSet::new())),
            artwork_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add_artwork(&self, artwork: Artwork) {
        self.artworks
            .lock()
            .unwrap()
            .insert(artwork.artwork_id, artwork);
    }

    pub fn remove_artwork(&self, artwork_id: i64) {
        self.artworks.lock().unwrap().remove(&artwork_id);
    }

    /// 让该作品的读取返回非“未找到”的错误
    pub fn break_artwork(&self, artwork_id: i64) {
        self.broken.lock().unwrap().insert(artwork_id);
    }

    pub fn artwork_calls(&self) -> usize {
        self.artwork_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteService for MockSite {
    fn site_key(&self) -> &str {
        &self.key
    }

    fn site_name(&self) -> &str {
        &self.key
    }

    async fn search_artwork_ids(&self, rule: &SearchRule, page: Page) -> CuratorResult<Vec<i64>> {
        let ids: Vec<i64> = self
            .artworks
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.tags.iter().any(|t| t.eq_ignore_ascii_case(&rule.search_text)))
            .map(|a| a.artwork_id)
            .collect();
        Ok(paginate(&ids, page))
    }

    async fn author_ids(&self, artwork_ids: &[i64]) -> CuratorResult<HashMap<i64, i64>> {
        let artworks = self.artworks.lock().unwrap();
        Ok(artwork_ids
            .iter()
            .filter_map(|id| artworks.get(id).map(|a| (*id, a.author.id)))
            .collect())
    }

    async fn get_artwork(&self, artwork_id: i64) -> CuratorResult<Artwork> {
        self.artwork_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().contains(&artwork_id) {
            return Err(CuratorError::Internal(format!("站点读取失败: {artwork_id}")));
        }
        self.artworks
            .lock()
            .unwrap()
            .get(&artwork_id)
            .cloned()
            .ok_or_else(|| CuratorError::ArtworkNotFound {
                site_key: self.key.clone(),
                artwork_id,
            })
    }

    async fn get_artwork_media(&self, artwork_id: i64) -> CuratorResult<Vec<MediaBlob>> {
        if self.artworks.lock().unwrap().contains_key(&artwork_id) {
            Ok(vec![artwork_id.to_le_bytes().to_vec()])
        } else {
            Err(CuratorError::ArtworkNotFound {
                site_key: self.key.clone(),
                artwork_id,
            })
        }
    }
}

/// 推送目标的预设返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkResponse {
    Ok,
    RateLimited(u64),
    Network,
    Rejected,
}

/// 记录所有发送消息的推送目标
///
/// 预设返回按顺序消费，用完后全部成功。
#[derive(Debug, Clone, Default)]
pub struct RecordingDeliverySink {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    attempts: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<SinkResponse>>>,
}

impl RecordingDeliverySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(responses: Vec<SinkResponse>) -> Self {
        let sink = Self::new();
        sink.script.lock().unwrap().extend(responses);
        sink
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn respond(&self, message: OutgoingMessage) -> CuratorResult<i64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SinkResponse::Ok);
        match response {
            SinkResponse::Ok => {
                let mut sent = self.sent.lock().unwrap();
                sent.push(message);
                Ok(1000 + sent.len() as i64)
            }
            SinkResponse::RateLimited(secs) => Err(CuratorError::RateLimited {
                retry_after_secs: secs,
            }),
            SinkResponse::Network => Err(CuratorError::Delivery("connection reset".to_string())),
            SinkResponse::Rejected => Err(CuratorError::DeliveryRejected("chat not found".to_string())),
        }
    }
}

#[async_trait]
impl DeliverySink for RecordingDeliverySink {
    async fn send(&self, message: &OutgoingMessage) -> CuratorResult<i64> {
        self.respond(message.clone())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> CuratorResult<i64> {
        self.respond(OutgoingMessage {
            chat_id,
            caption: text.to_string(),
            media: Vec::new(),
            media_kind: curator_core::MediaKind::Static,
        })
    }
}
