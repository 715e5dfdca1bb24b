use std::sync::Arc;

use anyhow::{Context, Result};
use curator_core::config::{AppConfig, SetStoreBackend};
use curator_core::{DeliverySink, SetStore};
use curator_dispatcher::{AutoPushJob, JobSettings, RunningConfigs};
use curator_domain::{PushService, QueueEngine, QueueSettings, ReviewService, SitesManager};
use curator_infrastructure::{
    DatabaseManager, InMemorySetStore, MirrorSite, RedisSetStore, SqliteAutoPushConfigRepository,
    SqlitePushRecordRepository, SqliteTagConfigRepository, SqliteWorkItemRepository,
    SqliteWorkspaceRepository, TelegramDeliverySink,
};
use curator_namemap::{NameMapFactory, NameMapWatcher, TagFormatterService};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 应用运行模式
#[derive(Debug, Clone, Copy)]
pub enum AppMode {
    /// 常驻运行自动推送调度
    Scheduler,
    /// 立即执行一次指定配置后退出
    Once(i64),
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    job: Arc<AutoPushJob>,
    name_maps: Arc<NameMapFactory>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("连接数据库: {}", mask_url(&config.database.url));
        let database = DatabaseManager::new(&config.database)
            .await
            .context("连接数据库失败")?;
        let pool = database.pool().clone();

        let work_items = Arc::new(SqliteWorkItemRepository::new(pool.clone()));
        let workspaces = Arc::new(SqliteWorkspaceRepository::new(pool.clone()));
        let push_records = Arc::new(SqlitePushRecordRepository::new(pool.clone()));
        let auto_push_configs = Arc::new(SqliteAutoPushConfigRepository::new(pool.clone()));
        let tag_configs = Arc::new(SqliteTagConfigRepository::new(pool.clone()));

        let sets = create_set_store(&config).await?;

        let mut sites = SitesManager::new();
        for site in &config.sites {
            info!("注册站点: {} ({})", site.name, site.key);
            sites.register(Arc::new(MirrorSite::new(&site.key, &site.name, pool.clone())));
        }
        if sites.is_empty() {
            warn!("没有配置任何站点，同步不会产生新的审核记录");
        }

        let queue = Arc::new(
            QueueEngine::new(
                work_items.clone(),
                workspaces.clone(),
                push_records.clone(),
                sets,
                sites,
            )
            .with_settings(QueueSettings::from(&config.auto_push)),
        );
        let reviews = Arc::new(ReviewService::new(work_items, workspaces.clone(), queue));
        let pushes = Arc::new(PushService::new(push_records));

        let name_maps = Arc::new(NameMapFactory::new(tag_configs.clone(), &config.name_map));
        name_maps.initialize().await;
        let tags = Arc::new(TagFormatterService::new(tag_configs, name_maps.clone()));

        let sink: Arc<dyn DeliverySink> =
            Arc::new(TelegramDeliverySink::new(&config.delivery).context("创建推送客户端失败")?);

        let job = Arc::new(AutoPushJob::new(
            auto_push_configs,
            workspaces,
            reviews,
            pushes,
            sink,
            tags,
            RunningConfigs::new(),
            JobSettings::from_config(&config.auto_push, config.delivery.owner_chat_id),
        ));

        Ok(Self {
            config,
            job,
            name_maps,
        })
    }

    pub async fn run(&self, mode: AppMode, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", mode);

        let watcher = if self.config.name_map.watch {
            NameMapWatcher::start(self.name_maps.clone()).context("启动名称映射监听失败")?
        } else {
            None
        };

        match mode {
            AppMode::Scheduler => {
                if self.config.auto_push.enabled {
                    Arc::clone(&self.job).run(shutdown_rx).await;
                } else {
                    warn!("自动推送已在配置中禁用，等待关闭信号");
                    let _ = shutdown_rx.recv().await;
                }
            }
            AppMode::Once(config_id) => {
                let handle = self.job.run_now(config_id).await?;
                tokio::select! {
                    result = handle => result.context("自动推送任务异常退出")?,
                    _ = shutdown_rx.recv() => warn!("执行期间收到关闭信号"),
                }
            }
        }

        if let Some(watcher) = watcher {
            watcher.stop().await;
        }
        info!("应用程序已停止");
        Ok(())
    }
}

async fn create_set_store(config: &AppConfig) -> Result<Arc<dyn SetStore>> {
    match config.set_store.backend {
        SetStoreBackend::Redis => {
            info!("连接集合存储: {}", mask_url(&config.set_store.url));
            let store = RedisSetStore::new(&config.set_store.url, config.set_store.key_prefix.clone())
                .await
                .context("连接Redis失败")?;
            Ok(Arc::new(store))
        }
        SetStoreBackend::Memory => {
            warn!("使用内存集合存储，待处理集合不会在重启后保留");
            Ok(Arc::new(InMemorySetStore::new()))
        }
    }
}

/// 屏蔽URL中的密码
fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos + 1 < at_pos && !url[colon_pos + 1..at_pos].starts_with("//") {
                let mut masked = url.to_string();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
    }
    url.to_string()
}
