use std::sync::Arc;

use chrono::Utc;
use curator_core::{Artwork, CuratorResult, TagConfig, TagConfigRepository};
use tracing::{debug, info, warn};

use crate::factory::NameMapFactory;
use crate::name_map::{format_hash_tags, NameMap};

/// 标签格式化服务
///
/// 配置变更后都会清空实例缓存，使新配置在下一次查询时生效。
pub struct TagFormatterService {
    repository: Arc<dyn TagConfigRepository>,
    factory: Arc<NameMapFactory>,
}

impl TagFormatterService {
    pub fn new(repository: Arc<dyn TagConfigRepository>, factory: Arc<NameMapFactory>) -> Self {
        Self { repository, factory }
    }

    pub fn factory(&self) -> &Arc<NameMapFactory> {
        &self.factory
    }

    /// 格式化作品标签
    ///
    /// 不过滤时输出全部标签；找不到名称映射或处理出错时同样退回全部标签。
    pub async fn format_tags(
        &self,
        artwork: &Artwork,
        filter_character_tags: bool,
        workspace_id: Option<i64>,
    ) -> String {
        if !filter_character_tags {
            return format_hash_tags(&artwork.tags);
        }

        match self.factory.get_instance(workspace_id).await {
            Ok(Some(name_map)) => name_map.filter_character_tags(&artwork.tags),
            Ok(None) => {
                debug!("工作空间 {:?} 没有可用的名称映射，输出原始标签", workspace_id);
                format_hash_tags(&artwork.tags)
            }
            Err(e) => {
                warn!("名称映射格式化失败 (workspace={:?}): {}，输出原始标签", workspace_id, e);
                format_hash_tags(&artwork.tags)
            }
        }
    }

    pub async fn create_config(
        &self,
        workspace_id: Option<i64>,
        config_key: &str,
        file_path: Option<String>,
        description: Option<String>,
        priority: i32,
        is_global_default: bool,
    ) -> CuratorResult<TagConfig> {
        let mut config = TagConfig::new(workspace_id, config_key);
        config.file_path = file_path;
        config.description = description;
        config.priority = priority;

        let mut created = self.repository.create(&config).await?;
        if is_global_default && self.repository.set_global_default(created.id).await? {
            created.is_global_default = true;
        }
        info!(
            "创建名称映射配置: id={}, workspace={:?}, key={}",
            created.id, workspace_id, config_key
        );

        self.factory.clear_cache().await;
        Ok(created)
    }

    pub async fn set_global_default(&self, config_id: i64) -> CuratorResult<bool> {
        let updated = self.repository.set_global_default(config_id).await?;
        if updated {
            self.factory.clear_cache().await;
        }
        Ok(updated)
    }

    /// 启用或停用配置，配置不存在时返回 false
    pub async fn set_active(&self, config_id: i64, is_active: bool) -> CuratorResult<bool> {
        let Some(mut config) = self.repository.get_by_id(config_id).await? else {
            return Ok(false);
        };
        config.is_active = is_active;
        config.updated_at = Utc::now();
        self.repository.update(&config).await?;

        self.factory.clear_cache().await;
        Ok(true)
    }

    pub async fn delete_config(&self, config_id: i64) -> CuratorResult<bool> {
        let deleted = self.repository.delete(config_id).await?;
        if deleted {
            self.factory.clear_cache().await;
        }
        Ok(deleted)
    }

    pub async fn list_configs(&self, workspace_id: Option<i64>) -> CuratorResult<Vec<TagConfig>> {
        self.repository.list_by_workspace(workspace_id).await
    }

    pub async fn active_config(&self, workspace_id: Option<i64>) -> CuratorResult<Option<TagConfig>> {
        self.repository.get_active(workspace_id).await
    }

    pub async fn name_map_for(&self, workspace_id: Option<i64>) -> CuratorResult<Option<Arc<NameMap>>> {
        self.factory.get_instance(workspace_id).await
    }

    pub fn list_available_name_maps(&self) -> Vec<String> {
        self.factory.list_available_keys()
    }
}
