use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use curator_core::config::NameMapSettings;
use curator_core::{CuratorError, CuratorResult, TagConfig, TagConfigRepository};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::name_map::NameMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Workspace(i64, String),
    Key(String),
}

impl CacheKey {
    fn label(&self) -> String {
        match self {
            CacheKey::Workspace(workspace_id, key) => format!("workspace:{workspace_id}:{key}"),
            CacheKey::Key(key) => format!("key:{key}"),
        }
    }
}

struct CachedInstance {
    instance: Arc<NameMap>,
    last_access: AtomicU64,
}

#[derive(Default)]
struct InstanceCache {
    entries: HashMap<CacheKey, CachedInstance>,
    /// 已确认使用全局默认的工作空间
    fallbacks: HashSet<i64>,
}

impl InstanceCache {
    fn find_workspace(&self, workspace_id: i64) -> Option<&CachedInstance> {
        self.entries
            .iter()
            .find(|(key, _)| matches!(key, CacheKey::Workspace(id, _) if *id == workspace_id))
            .map(|(_, cached)| cached)
    }
}

/// 缓存条目信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
    pub key: String,
    pub source: Option<PathBuf>,
}

/// 名称映射实例工厂
///
/// 解析顺序：工作空间的启用配置 -> 全局默认配置 -> 无。
/// 工作空间实例按 `(workspace_id, config_key)` 缓存，容量满时淘汰最久未访问的条目；
/// 全局默认实例单独缓存，回退到全局默认的工作空间也会被记录。
/// 未命中时持有写锁并二次检查，保证同一数据集只加载一次。
pub struct NameMapFactory {
    repository: Arc<dyn TagConfigRepository>,
    base_path: PathBuf,
    name_map_dir: PathBuf,
    capacity: usize,
    cache: RwLock<InstanceCache>,
    global_default: RwLock<Option<Arc<NameMap>>>,
    access_tick: AtomicU64,
    load_count: AtomicU64,
}

impl NameMapFactory {
    pub fn new(repository: Arc<dyn TagConfigRepository>, settings: &NameMapSettings) -> Self {
        let base_path = PathBuf::from(&settings.base_path);
        let name_map_dir = base_path.join(&settings.dir);
        Self {
            repository,
            base_path,
            name_map_dir,
            capacity: settings.cache_capacity.max(1),
            cache: RwLock::new(InstanceCache::default()),
            global_default: RwLock::new(None),
            access_tick: AtomicU64::new(0),
            load_count: AtomicU64::new(0),
        }
    }

    pub fn name_map_dir(&self) -> &Path {
        &self.name_map_dir
    }

    /// 启动时预加载全局默认实例
    pub async fn initialize(&self) {
        info!(
            "名称映射工厂已初始化，可用数据集: {:?}",
            self.list_available_keys()
        );
        match self.get_global_default().await {
            Ok(Some(_)) => info!("全局默认名称映射已预加载"),
            Ok(None) => info!("未配置全局默认名称映射，标签将原样输出"),
            Err(e) => warn!("预加载全局默认名称映射失败: {}", e),
        }
    }

    /// 获取工作空间对应的实例，`None` 表示使用全局默认
    pub async fn get_instance(&self, workspace_id: Option<i64>) -> CuratorResult<Option<Arc<NameMap>>> {
        let Some(workspace_id) = workspace_id else {
            return self.get_global_default().await;
        };

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.find_workspace(workspace_id) {
                self.touch(cached);
                return Ok(Some(cached.instance.clone()));
            }
            if cache.fallbacks.contains(&workspace_id) {
                drop(cache);
                return self.get_global_default().await;
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.find_workspace(workspace_id) {
            debug!("等待写锁期间实例已创建: workspace={}", workspace_id);
            self.touch(cached);
            return Ok(Some(cached.instance.clone()));
        }
        if cache.fallbacks.contains(&workspace_id) {
            drop(cache);
            return self.get_global_default().await;
        }

        let Some(config) = self.repository.get_active(Some(workspace_id)).await? else {
            debug!("工作空间 {} 没有专属配置，使用全局默认", workspace_id);
            cache.fallbacks.insert(workspace_id);
            drop(cache);
            return self.get_global_default().await;
        };

        let path = self.resolve_path(&config);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!(
                "名称映射文件不存在: {} (workspace={}, key={})，使用全局默认",
                path.display(),
                workspace_id,
                config.config_key
            );
            cache.fallbacks.insert(workspace_id);
            drop(cache);
            return self.get_global_default().await;
        }

        match self.load_file(&path).await {
            Ok(instance) => {
                let key = CacheKey::Workspace(workspace_id, config.config_key.clone());
                self.insert(&mut cache, key, instance.clone());
                info!(
                    "已为工作空间 {} 创建名称映射实例: {} ({})",
                    workspace_id,
                    config.config_key,
                    path.display()
                );
                Ok(Some(instance))
            }
            Err(e) => {
                error!(
                    "加载工作空间 {} 的名称映射失败: {}，使用全局默认",
                    workspace_id, e
                );
                cache.fallbacks.insert(workspace_id);
                drop(cache);
                self.get_global_default().await
            }
        }
    }

    /// 获取全局默认实例
    pub async fn get_global_default(&self) -> CuratorResult<Option<Arc<NameMap>>> {
        if let Some(instance) = self.global_default.read().await.as_ref() {
            return Ok(Some(instance.clone()));
        }

        let mut slot = self.global_default.write().await;
        if let Some(instance) = slot.as_ref() {
            return Ok(Some(instance.clone()));
        }

        let Some(config) = self.repository.get_global_default().await? else {
            debug!("没有全局默认名称映射配置");
            return Ok(None);
        };

        let path = self.resolve_path(&config);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!(
                "名称映射文件不存在: {} (key={})，标签将原样输出",
                path.display(),
                config.config_key
            );
            return Ok(None);
        }

        match self.load_file(&path).await {
            Ok(instance) => {
                *slot = Some(instance.clone());
                info!(
                    "已加载全局默认名称映射: {} ({})",
                    config.config_key,
                    path.display()
                );
                Ok(Some(instance))
            }
            Err(e) => {
                error!("加载全局默认名称映射失败: {}", e);
                Ok(None)
            }
        }
    }

    /// 不经过配置，直接按数据集键加载 `{dir}/{key}.json`
    pub async fn load_by_key(&self, key: &str) -> CuratorResult<Arc<NameMap>> {
        let cache_key = CacheKey::Key(key.to_string());
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.entries.get(&cache_key) {
                self.touch(cached);
                return Ok(cached.instance.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.entries.get(&cache_key) {
            self.touch(cached);
            return Ok(cached.instance.clone());
        }

        let path = self.name_map_dir.join(format!("{key}.json"));
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CuratorError::NameMap(format!(
                "名称映射文件不存在: {}，可用数据集: {}",
                path.display(),
                self.list_available_keys().join(", ")
            )));
        }

        let instance = self.load_file(&path).await?;
        self.insert(&mut cache, cache_key, instance.clone());
        debug!("按键加载名称映射: key={}, file={}", key, path.display());
        Ok(instance)
    }

    /// 数据集目录下所有 `.json` 文件的文件名
    pub fn list_available_keys(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.name_map_dir) {
            Ok(entries) => entries,
            Err(_) => {
                warn!("名称映射目录不存在: {}", self.name_map_dir.display());
                return Vec::new();
            }
        };

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        keys.sort();
        keys
    }

    /// 清空所有缓存实例，包括全局默认
    pub async fn clear_cache(&self) {
        {
            let mut cache = self.cache.write().await;
            cache.entries.clear();
            cache.fallbacks.clear();
        }
        *self.global_default.write().await = None;
        info!("名称映射实例缓存已清空");
    }

    /// 当前缓存内容，按键排序
    pub async fn cache_info(&self) -> Vec<CacheEntryInfo> {
        let mut info: Vec<CacheEntryInfo> = {
            let cache = self.cache.read().await;
            cache
                .entries
                .iter()
                .map(|(key, cached)| CacheEntryInfo {
                    key: key.label(),
                    source: cached.instance.source().map(Path::to_path_buf),
                })
                .chain(cache.fallbacks.iter().map(|workspace_id| CacheEntryInfo {
                    key: format!("workspace:{workspace_id}:_global"),
                    source: None,
                }))
                .collect()
        };
        if let Some(instance) = self.global_default.read().await.as_ref() {
            info.push(CacheEntryInfo {
                key: "_global_default".to_string(),
                source: instance.source().map(Path::to_path_buf),
            });
        }
        info.sort_by(|a, b| a.key.cmp(&b.key));
        info
    }

    /// 累计从磁盘加载数据集的次数
    pub fn load_count(&self) -> u64 {
        self.load_count.load(Ordering::SeqCst)
    }

    fn resolve_path(&self, config: &TagConfig) -> PathBuf {
        match &config.file_path {
            Some(file_path) => self.base_path.join(file_path),
            None => self.name_map_dir.join(format!("{}.json", config.config_key)),
        }
    }

    async fn load_file(&self, path: &Path) -> CuratorResult<Arc<NameMap>> {
        let content = tokio::fs::read_to_string(path).await?;
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let instance = NameMap::from_json_str(&content, Some(path.to_path_buf()))?;
        Ok(Arc::new(instance))
    }

    fn touch(&self, cached: &CachedInstance) {
        let tick = self.access_tick.fetch_add(1, Ordering::Relaxed) + 1;
        cached.last_access.store(tick, Ordering::Relaxed);
    }

    fn insert(&self, cache: &mut InstanceCache, key: CacheKey, instance: Arc<NameMap>) {
        if !cache.entries.contains_key(&key) && cache.entries.len() >= self.capacity {
            let oldest = cache
                .entries
                .iter()
                .min_by_key(|(_, cached)| cached.last_access.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("淘汰名称映射缓存: {}", oldest.label());
                cache.entries.remove(&oldest);
            }
        }

        let tick = self.access_tick.fetch_add(1, Ordering::Relaxed) + 1;
        cache.entries.insert(
            key,
            CachedInstance {
                instance,
                last_access: AtomicU64::new(tick),
            },
        );
    }
}
