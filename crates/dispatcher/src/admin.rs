use std::sync::Arc;

use chrono::Utc;
use curator_core::{
    AutoPushConfig, AutoPushConfigRepository, AutoPushMode, AutoPushStatus, CuratorError,
    CuratorResult,
};
use tracing::info;

use crate::cron_utils::{next_run_time, CronScheduler};

/// 自动推送配置的管理操作
pub struct AutoPushConfigService {
    repository: Arc<dyn AutoPushConfigRepository>,
}

impl AutoPushConfigService {
    pub fn new(repository: Arc<dyn AutoPushConfigRepository>) -> Self {
        Self { repository }
    }

    /// 新建配置，初始为禁用状态
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        workspace_id: i64,
        name: &str,
        mode: AutoPushMode,
        cron_expression: &str,
        review_count: u32,
        push_to_owner: bool,
        run_once: bool,
        created_by: Option<i64>,
    ) -> CuratorResult<AutoPushConfig> {
        CronScheduler::validate_cron_expression(cron_expression)?;
        if review_count == 0 {
            return Err(CuratorError::Configuration(
                "审核数量必须大于0".to_string(),
            ));
        }

        let mut config = AutoPushConfig::new(workspace_id, name, mode, cron_expression, review_count);
        config.push_to_owner = push_to_owner;
        config.run_once = run_once;
        config.created_by = created_by;
        config.updated_by = created_by;
        config.next_run_time = Some(next_run_time(cron_expression, Utc::now())?);

        let created = self.repository.create(&config).await?;
        info!(
            "创建自动推送配置: id={}, workspace={}, cron={}",
            created.id, workspace_id, cron_expression
        );
        Ok(created)
    }

    pub async fn get(&self, config_id: i64) -> CuratorResult<AutoPushConfig> {
        self.repository
            .get_by_id(config_id)
            .await?
            .ok_or(CuratorError::ConfigNotFound { id: config_id })
    }

    pub async fn list_by_workspace(&self, workspace_id: i64) -> CuratorResult<Vec<AutoPushConfig>> {
        self.repository.list_by_workspace(workspace_id).await
    }

    /// 启用配置并按当前时间重新计算下次执行时间
    pub async fn enable(&self, config_id: i64, operator: Option<i64>) -> CuratorResult<AutoPushConfig> {
        let mut config = self.get(config_id).await?;
        if config.status == AutoPushStatus::Running {
            return Err(CuratorError::Configuration(format!(
                "配置 {config_id} 正在运行中"
            )));
        }
        config.next_run_time = Some(next_run_time(&config.cron_expression, Utc::now())?);
        config.set_status(AutoPushStatus::Enabled, operator);
        self.repository.update(&config).await?;
        info!("启用自动推送配置: id={}, 下次执行: {:?}", config.id, config.next_run_time);
        Ok(config)
    }

    pub async fn disable(&self, config_id: i64, operator: Option<i64>) -> CuratorResult<AutoPushConfig> {
        self.change_status(config_id, AutoPushStatus::Disabled, operator).await
    }

    pub async fn pause(&self, config_id: i64, operator: Option<i64>) -> CuratorResult<AutoPushConfig> {
        self.change_status(config_id, AutoPushStatus::Paused, operator).await
    }

    /// 把下次执行时间设为当前时间，启用中的配置会在下一次检查时执行
    pub async fn schedule_now(&self, config_id: i64, operator: Option<i64>) -> CuratorResult<AutoPushConfig> {
        let mut config = self.get(config_id).await?;
        if config.status != AutoPushStatus::Enabled {
            return Err(CuratorError::Configuration(format!(
                "配置 {config_id} 当前状态为 {}，只有启用的配置可以立即执行",
                config.status
            )));
        }
        config.next_run_time = Some(Utc::now());
        config.updated_by = operator;
        config.updated_at = Utc::now();
        self.repository.update(&config).await?;
        info!("自动推送配置 {} 将在下一次检查时执行", config_id);
        Ok(config)
    }

    pub async fn delete(&self, config_id: i64) -> CuratorResult<bool> {
        let deleted = self.repository.delete(config_id).await?;
        if deleted {
            info!("删除自动推送配置: id={}", config_id);
        }
        Ok(deleted)
    }

    // 运行中的配置也允许修改，执行结束时保留新状态
    async fn change_status(
        &self,
        config_id: i64,
        status: AutoPushStatus,
        operator: Option<i64>,
    ) -> CuratorResult<AutoPushConfig> {
        let mut config = self.get(config_id).await?;
        config.set_status(status, operator);
        self.repository.update(&config).await?;
        info!("自动推送配置 {} 状态更新为 {}", config_id, status);
        Ok(config)
    }
}
