//! 自动推送任务
//!
//! 定时检查到期的自动推送配置，对每个配置执行一次“同步 -> 自动审核 -> 推送”流程。
//! 同一配置内的作品严格顺序处理，不同配置之间并发执行。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use metrics::counter;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, info_span, warn, Instrument};

use curator_core::config::AutoPushSettings;
use curator_core::{
    Artwork, AutoPushConfig, AutoPushConfigRepository, AutoPushMode, AutoPushStatus,
    AutoReviewDecision, CuratorError, CuratorResult, DeliverySink, MediaBlob, OutgoingMessage,
    WorkItem, WorkItemStatus, WorkspaceRepository,
};
use curator_domain::{PushContext, PushService, ReviewService};
use curator_namemap::TagFormatterService;

use crate::captions;
use crate::cron_utils::next_run_time;
use crate::running::RunningConfigs;

/// 任务运行参数
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub tick_interval: Duration,
    pub initial_delay: Duration,
    pub decision_delay: Duration,
    pub item_delay: Duration,
    pub rate_limit_padding: Duration,
    pub network_retry_delay: Duration,
    pub max_delivery_retries: u32,
    pub max_rate_limit_retries: u32,
    pub shutdown_timeout: Duration,
    /// 自动审核结果同步的管理员会话
    pub owner_chat_id: Option<i64>,
}

impl JobSettings {
    pub fn from_config(settings: &AutoPushSettings, owner_chat_id: Option<i64>) -> Self {
        Self {
            tick_interval: Duration::from_secs(settings.tick_interval_seconds.max(1)),
            initial_delay: Duration::from_secs(settings.initial_delay_seconds),
            decision_delay: Duration::from_millis(settings.decision_delay_ms),
            item_delay: Duration::from_millis(settings.item_delay_ms),
            rate_limit_padding: Duration::from_secs(settings.rate_limit_padding_seconds),
            network_retry_delay: Duration::from_secs(settings.network_retry_delay_seconds),
            max_delivery_retries: settings.max_delivery_retries,
            max_rate_limit_retries: settings.max_rate_limit_retries,
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_seconds),
            owner_chat_id,
        }
    }
}

/// 一次执行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: u32,
    pub rejected: u32,
    pub skipped: u32,
    pub not_found: u32,
    pub errors: u32,
    pub delivered: u32,
    pub delivery_failed: u32,
}

impl RunSummary {
    /// 计入审核数量的结论数
    pub fn decided(&self) -> u32 {
        self.passed + self.rejected
    }
}

/// 已下载的作品内容
struct Prepared {
    artwork: Artwork,
    media: Vec<MediaBlob>,
}

enum Outcome {
    Passed(Prepared),
    Rejected,
    Skipped,
    NotFound,
    Failed,
}

pub struct AutoPushJob {
    configs: Arc<dyn AutoPushConfigRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
    reviews: Arc<ReviewService>,
    pushes: Arc<PushService>,
    sink: Arc<dyn DeliverySink>,
    tags: Arc<TagFormatterService>,
    running: RunningConfigs,
    settings: JobSettings,
}

impl AutoPushJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        configs: Arc<dyn AutoPushConfigRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        reviews: Arc<ReviewService>,
        pushes: Arc<PushService>,
        sink: Arc<dyn DeliverySink>,
        tags: Arc<TagFormatterService>,
        running: RunningConfigs,
        settings: JobSettings,
    ) -> Self {
        Self {
            configs,
            workspaces,
            reviews,
            pushes,
            sink,
            tags,
            running,
            settings,
        }
    }

    pub fn running(&self) -> &RunningConfigs {
        &self.running
    }

    /// 调度主循环，收到关闭信号后等待执行中的任务结束
    pub async fn run(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "自动推送调度已启动，每 {} 秒检查一次待执行任务",
            self.settings.tick_interval.as_secs()
        );

        tokio::select! {
            _ = sleep(self.settings.initial_delay) => {}
            _ = shutdown_rx.recv() => {
                info!("自动推送调度在启动前收到关闭信号");
                return;
            }
        }

        if let Err(e) = self.recover_stale().await {
            error!("恢复遗留的运行中配置失败: {}", e);
        }

        let mut interval = tokio::time::interval(self.settings.tick_interval);
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    in_flight.retain(|handle| !handle.is_finished());
                    match self.tick().await {
                        Ok(handles) => in_flight.extend(handles),
                        Err(e) => error!("检查自动推送任务时发生错误: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("自动推送调度收到关闭信号");
                    break;
                }
            }
        }

        in_flight.retain(|handle| !handle.is_finished());
        if !in_flight.is_empty() {
            info!("等待 {} 个执行中的自动推送任务完成", in_flight.len());
            if timeout(
                self.settings.shutdown_timeout,
                futures::future::join_all(in_flight),
            )
            .await
            .is_err()
            {
                warn!(
                    "等待自动推送任务超时（{}秒）",
                    self.settings.shutdown_timeout.as_secs()
                );
            }
        }
        info!("自动推送调度已停止");
    }

    /// 启动所有到期且未在执行的配置，返回各执行的句柄
    pub async fn tick(self: &Arc<Self>) -> CuratorResult<Vec<JoinHandle<()>>> {
        let now = Utc::now();
        let configs = self.configs.list_by_status(AutoPushStatus::Enabled).await?;

        let mut handles = Vec::new();
        for config in configs {
            if !config.is_due(now) || self.running.contains(config.id) {
                continue;
            }
            info!("开始执行自动推送任务: {} (ID: {})", config.name, config.id);
            handles.push(self.spawn_execution(config));
        }
        Ok(handles)
    }

    /// 立即执行一次配置，不影响原有的定时计划
    pub async fn run_now(self: &Arc<Self>, config_id: i64) -> CuratorResult<JoinHandle<()>> {
        let config = self
            .configs
            .get_by_id(config_id)
            .await?
            .ok_or(CuratorError::ConfigNotFound { id: config_id })?;
        if config.status == AutoPushStatus::Running || self.running.contains(config_id) {
            return Err(CuratorError::Configuration(format!(
                "配置 {config_id} 正在运行中"
            )));
        }
        info!("立即执行自动推送任务: {} (ID: {})", config.name, config.id);
        Ok(self.spawn_execution(config))
    }

    fn spawn_execution(self: &Arc<Self>, config: AutoPushConfig) -> JoinHandle<()> {
        let job = Arc::clone(self);
        tokio::spawn(async move {
            let config_id = config.id;
            if let Err(e) = job.execute(config).await {
                debug!("自动推送任务 {} 以错误结束: {}", config_id, e);
            }
        })
    }

    /// 执行一次配置
    ///
    /// 配置已在执行时返回 `Ok(None)`。无论流程成功、出错还是 panic，
    /// 结束时都会更新配置状态并释放运行标记。
    pub async fn execute(&self, config: AutoPushConfig) -> CuratorResult<Option<RunSummary>> {
        let Some(_guard) = self.running.try_acquire(config.id) else {
            debug!("自动推送任务 {} 正在运行，跳过", config.id);
            return Ok(None);
        };

        let previous_status = config.status;
        let mut config = config;
        config.mark_running(Utc::now());
        self.configs.update(&config).await?;

        info!(
            "执行自动推送任务: {} (workspace={}, mode={})",
            config.name, config.workspace_id, config.mode
        );

        let span = info_span!(
            "auto_push",
            config_id = config.id,
            workspace_id = config.workspace_id
        );
        let result = AssertUnwindSafe(self.run_pipeline(&config).instrument(span))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(summary)) => {
                info!(
                    "自动推送任务执行完成: {}，通过 {} 个，拒绝 {} 个，推送成功 {} 个，失败 {} 个",
                    config.name,
                    summary.passed,
                    summary.rejected,
                    summary.delivered,
                    summary.delivery_failed
                );
                counter!("curator_auto_push_runs_total", "outcome" => "completed").increment(1);
                Ok(Some(summary))
            }
            Ok(Err(e)) => {
                error!("执行自动推送任务时发生错误: {}: {}", config.name, e);
                counter!("curator_auto_push_runs_total", "outcome" => "failed").increment(1);
                Err(e)
            }
            Err(_) => {
                error!("执行自动推送任务时发生 panic: {}", config.name);
                counter!("curator_auto_push_runs_total", "outcome" => "panicked").increment(1);
                Err(CuratorError::Internal(format!(
                    "自动推送任务 {} 异常终止",
                    config.id
                )))
            }
        };

        if let Err(e) = self.finalize(&config, previous_status).await {
            error!("更新自动推送配置 {} 状态失败: {}", config.id, e);
        }
        outcome
    }

    /// 执行结束后的状态转换
    async fn finalize(&self, config: &AutoPushConfig, previous_status: AutoPushStatus) -> CuratorResult<()> {
        let Some(mut current) = self.configs.get_by_id(config.id).await? else {
            warn!("自动推送配置 {} 在执行期间被删除", config.id);
            return Ok(());
        };
        current.last_run_time = config.last_run_time;

        if matches!(current.status, AutoPushStatus::Disabled | AutoPushStatus::Paused) {
            info!("配置 {} 在执行期间被设为 {}，保持不变", current.id, current.status);
            current.updated_at = Utc::now();
        } else if config.run_once {
            info!("配置 '{}' 设置为仅运行一次，已自动禁用", current.name);
            current.set_status(AutoPushStatus::Disabled, None);
        } else if matches!(previous_status, AutoPushStatus::Disabled | AutoPushStatus::Paused) {
            current.set_status(previous_status, None);
        } else {
            match next_run_time(&current.cron_expression, Utc::now()) {
                Ok(next) => {
                    current.next_run_time = Some(next);
                    current.set_status(AutoPushStatus::Enabled, None);
                }
                Err(e) => {
                    error!("配置 {} 的CRON表达式无效，已禁用: {}", current.id, e);
                    current.set_status(AutoPushStatus::Disabled, None);
                }
            }
        }

        self.configs.update(&current).await
    }

    /// 把上次进程退出时遗留为 RUNNING 的配置恢复为 ENABLED
    pub async fn recover_stale(&self) -> CuratorResult<u64> {
        let mut recovered = 0;
        for mut config in self.configs.list_by_status(AutoPushStatus::Running).await? {
            if self.running.contains(config.id) {
                continue;
            }
            if config.next_run_time.is_none() {
                config.next_run_time = next_run_time(&config.cron_expression, Utc::now()).ok();
            }
            config.set_status(AutoPushStatus::Enabled, None);
            self.configs.update(&config).await?;
            warn!("自动推送配置 {} 遗留为运行中，已恢复为启用", config.id);
            recovered += 1;
        }
        Ok(recovered)
    }

    async fn run_pipeline(&self, config: &AutoPushConfig) -> CuratorResult<RunSummary> {
        let workspace_id = config.workspace_id;
        let channel_id = self.channel_for(workspace_id).await?;
        let queue = self.reviews.queue();

        let created = queue.reconcile(workspace_id, config.created_by).await?;
        queue.enqueue_pending(workspace_id).await?;
        let pending = queue.pending_review_count(workspace_id).await?;
        info!("审核队列初始化完成，新增 {} 条记录，共 {} 个待审核作品", created, pending);

        if pending == 0 {
            info!("没有待审核作品，跳过任务");
            return Ok(RunSummary::default());
        }

        match config.mode {
            AutoPushMode::Batch => self.run_batch(config, channel_id).await,
            AutoPushMode::Immediate => self.run_immediate(config, channel_id).await,
        }
    }

    async fn channel_for(&self, workspace_id: i64) -> CuratorResult<i64> {
        self.workspaces
            .list_channels(workspace_id)
            .await?
            .first()
            .map(|channel| channel.channel_id)
            .ok_or(CuratorError::ChannelNotConfigured {
                work_id: workspace_id,
            })
    }

    /// 批量模式：先审核，再统一推送通过的作品
    async fn run_batch(&self, config: &AutoPushConfig, channel_id: i64) -> CuratorResult<RunSummary> {
        let workspace_id = config.workspace_id;
        let queue = self.reviews.queue();
        let mut summary = RunSummary::default();
        let mut passed = Vec::new();

        while summary.decided() < config.review_count {
            let Some(item) = queue.dequeue_for_review(workspace_id).await? else {
                info!("审核队列已空，实际处理 {} 个作品", summary.decided());
                break;
            };

            match self.review_item(config, &item).await {
                Outcome::Passed(_) => {
                    summary.passed += 1;
                    passed.push(item.id);
                    info!(
                        "作品自动通过 [{}/{}]: {}[{}]",
                        summary.decided(),
                        config.review_count,
                        item.site_key,
                        item.artwork_id
                    );
                    pause(self.settings.decision_delay).await;
                }
                Outcome::Rejected => {
                    summary.rejected += 1;
                    info!(
                        "作品自动拒绝 [{}/{}]: {}[{}]",
                        summary.decided(),
                        config.review_count,
                        item.site_key,
                        item.artwork_id
                    );
                    pause(self.settings.decision_delay).await;
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::NotFound => summary.not_found += 1,
                Outcome::Failed => summary.errors += 1,
            }
        }

        info!(
            "批量模式: 完成自动审核，通过 {} 个，拒绝 {} 个",
            summary.passed, summary.rejected
        );

        if !passed.is_empty() {
            queue.enqueue_for_push(workspace_id, &passed).await?;
            info!("批量模式: 开始推送 {} 个作品", passed.len());
            self.drain_pending_push(config, channel_id, passed.len(), &mut summary)
                .await?;
        }
        Ok(summary)
    }

    /// 从待推送集合逐个取出并推送，限流时放回集合并等待
    async fn drain_pending_push(
        &self,
        config: &AutoPushConfig,
        channel_id: i64,
        expected: usize,
        summary: &mut RunSummary,
    ) -> CuratorResult<()> {
        let workspace_id = config.workspace_id;
        let queue = self.reviews.queue();
        let mut handled = 0;
        let mut rate_limited = 0;

        while handled < expected {
            let Some(context) = queue.dequeue_for_push(workspace_id).await? else {
                warn!("待推送集合已空，结束推送");
                break;
            };
            let review_id = context.item.id;

            match self.fetch_and_deliver(&context, channel_id, config).await {
                Ok(message_id) => {
                    handled += 1;
                    summary.delivered += 1;
                    info!("作品推送成功: review={} message={}", review_id, message_id);
                }
                Err(e) if e.is_rate_limited() => {
                    queue.undo_push(workspace_id, review_id).await?;
                    rate_limited += 1;
                    if rate_limited > self.settings.max_rate_limit_retries {
                        warn!("限流次数超过 {} 次，停止本次推送", self.settings.max_rate_limit_retries);
                        break;
                    }
                    let wait = self.rate_limit_wait(&e);
                    warn!("触发推送限流，等待 {} 秒", wait.as_secs());
                    sleep(wait).await;
                    continue;
                }
                Err(e) => {
                    handled += 1;
                    summary.delivery_failed += 1;
                    error!("推送作品时发生错误: review={}: {}", review_id, e);
                    self.record_failure(review_id, channel_id, config).await;
                }
            }
            pause(self.settings.item_delay).await;
        }

        info!(
            "批量推送完成: 成功 {} 个，失败 {} 个",
            summary.delivered, summary.delivery_failed
        );
        Ok(())
    }

    /// 即时模式：每通过一个作品立即推送
    async fn run_immediate(&self, config: &AutoPushConfig, channel_id: i64) -> CuratorResult<RunSummary> {
        let workspace_id = config.workspace_id;
        let queue = self.reviews.queue();
        let mut summary = RunSummary::default();

        while summary.decided() < config.review_count {
            let Some(item) = queue.dequeue_for_review(workspace_id).await? else {
                info!("审核队列已空，实际处理 {} 个作品", summary.decided());
                break;
            };

            match self.review_item(config, &item).await {
                Outcome::Passed(prepared) => {
                    // 推送前重新读取，撤回的记录不再推送
                    match self.reviews.get(item.id).await {
                        Ok(current) if current.status == WorkItemStatus::Pass => {
                            summary.passed += 1;
                            match self
                                .deliver_with_retry(&current, &prepared, channel_id, config)
                                .await
                            {
                                Ok(_) => {
                                    summary.delivered += 1;
                                    info!(
                                        "作品自动通过并推送 [{}/{}]: {}[{}]",
                                        summary.decided(),
                                        config.review_count,
                                        item.site_key,
                                        item.artwork_id
                                    );
                                }
                                Err(e) => {
                                    summary.delivery_failed += 1;
                                    error!("推送作品时发生错误: review={}: {}", item.id, e);
                                    self.record_failure(item.id, channel_id, config).await;
                                }
                            }
                        }
                        Ok(current) => {
                            summary.rejected += 1;
                            warn!(
                                "审核记录 {} 状态已被修改为 {}，跳过推送",
                                item.id, current.status
                            );
                        }
                        Err(e) => {
                            summary.rejected += 1;
                            warn!("审核记录 {} 无法重新读取，跳过推送: {}", item.id, e);
                        }
                    }
                }
                Outcome::Rejected => summary.rejected += 1,
                Outcome::Skipped => {
                    summary.skipped += 1;
                    continue;
                }
                Outcome::NotFound => summary.not_found += 1,
                Outcome::Failed => summary.errors += 1,
            }
            pause(self.settings.item_delay).await;
        }

        info!(
            "即时模式: 完成自动审核并推送，通过 {} 个，拒绝 {} 个",
            summary.passed, summary.rejected
        );
        Ok(summary)
    }

    /// 审核单个作品，错误在这里转换为记录状态
    async fn review_item(&self, config: &AutoPushConfig, item: &WorkItem) -> Outcome {
        match self.try_review_item(config, item).await {
            Ok(outcome) => outcome,
            Err(CuratorError::ArtworkNotFound { site_key, artwork_id }) => {
                warn!("作品不存在: {}[{}]", site_key, artwork_id);
                self.mark(item, WorkItemStatus::NotFound, config).await;
                Outcome::NotFound
            }
            Err(e) => {
                error!("审核作品时发生错误: {}[{}]: {}", item.site_key, item.artwork_id, e);
                self.mark(item, WorkItemStatus::Error, config).await;
                Outcome::Failed
            }
        }
    }

    async fn try_review_item(&self, config: &AutoPushConfig, item: &WorkItem) -> CuratorResult<Outcome> {
        if !item.is_waiting() {
            debug!("审核记录 {} 当前状态为 {}，跳过", item.id, item.status);
            return Ok(Outcome::Skipped);
        }
        let Some(author_id) = item.author_id else {
            debug!("作品 {}[{}] 缺少作者信息，跳过", item.site_key, item.artwork_id);
            return Ok(Outcome::Skipped);
        };
        let Some(result) = self
            .reviews
            .try_auto_review(item.workspace_id, &item.site_key, author_id)
            .await?
        else {
            debug!("作品无法自动审核，跳过: {}[{}]", item.site_key, item.artwork_id);
            return Ok(Outcome::Skipped);
        };

        let site = self.reviews.queue().sites().get(&item.site_key)?;
        let artwork = site.get_artwork(item.artwork_id).await?;
        let media = site.get_artwork_media(item.artwork_id).await?;

        if config.push_to_owner {
            self.mirror_to_owner(&artwork, &media, result.decision, item).await;
        }

        self.reviews
            .set_decision(item.id, result.decision.status(), true, config.created_by)
            .await?;

        Ok(match result.decision {
            AutoReviewDecision::Pass => {
                counter!("curator_auto_review_decisions_total", "decision" => "pass").increment(1);
                Outcome::Passed(Prepared { artwork, media })
            }
            AutoReviewDecision::Reject => {
                counter!("curator_auto_review_decisions_total", "decision" => "reject").increment(1);
                Outcome::Rejected
            }
        })
    }

    async fn mark(&self, item: &WorkItem, status: WorkItemStatus, config: &AutoPushConfig) {
        if let Err(e) = self
            .reviews
            .set_decision(item.id, status, false, config.created_by)
            .await
        {
            error!("更新审核记录 {} 为 {} 失败: {}", item.id, status, e);
        }
    }

    /// 把审核结论同步给管理员，失败只记录日志
    async fn mirror_to_owner(
        &self,
        artwork: &Artwork,
        media: &[MediaBlob],
        decision: AutoReviewDecision,
        item: &WorkItem,
    ) {
        let Some(owner_chat_id) = self.settings.owner_chat_id else {
            debug!("未配置管理员会话，跳过同步");
            return;
        };

        let tags = self
            .tags
            .format_tags(artwork, true, Some(item.workspace_id))
            .await;
        let message = OutgoingMessage {
            chat_id: owner_chat_id,
            caption: captions::owner_caption(artwork, &tags, decision, item.id, item.workspace_id),
            media: media.to_vec(),
            media_kind: artwork.media_kind,
        };
        if let Err(e) = self.sink.send(&message).await {
            error!("同步到管理员时发生错误: review={}: {}", item.id, e);
            return;
        }
        if let Err(e) = self
            .sink
            .send_text(owner_chat_id, &captions::owner_notice(decision, item.id))
            .await
        {
            error!("发送管理员提示时发生错误: review={}: {}", item.id, e);
        }
    }

    async fn fetch_and_deliver(
        &self,
        context: &PushContext,
        channel_id: i64,
        config: &AutoPushConfig,
    ) -> CuratorResult<i64> {
        let artwork_id = context.item.artwork_id;
        let prepared = Prepared {
            artwork: context.site.get_artwork(artwork_id).await?,
            media: context.site.get_artwork_media(artwork_id).await?,
        };
        self.deliver(&context.item, &prepared, channel_id, config).await
    }

    async fn deliver_with_retry(
        &self,
        item: &WorkItem,
        prepared: &Prepared,
        channel_id: i64,
        config: &AutoPushConfig,
    ) -> CuratorResult<i64> {
        let mut network_failures = 0;
        let mut rate_limited = 0;
        loop {
            match self.deliver(item, prepared, channel_id, config).await {
                Ok(message_id) => return Ok(message_id),
                Err(e) if e.is_rate_limited() && rate_limited < self.settings.max_rate_limit_retries => {
                    rate_limited += 1;
                    let wait = self.rate_limit_wait(&e);
                    warn!("触发推送限流，等待 {} 秒后重试", wait.as_secs());
                    sleep(wait).await;
                }
                Err(e)
                    if e.is_transient_delivery()
                        && network_failures < self.settings.max_delivery_retries =>
                {
                    network_failures += 1;
                    warn!(
                        "推送网络错误，第 {} 次重试: review={}: {}",
                        network_failures, item.id, e
                    );
                    sleep(self.settings.network_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 发送到频道并记录推送结果
    async fn deliver(
        &self,
        item: &WorkItem,
        prepared: &Prepared,
        channel_id: i64,
        config: &AutoPushConfig,
    ) -> CuratorResult<i64> {
        let tags = self
            .tags
            .format_tags(&prepared.artwork, true, Some(item.workspace_id))
            .await;
        let message = OutgoingMessage {
            chat_id: channel_id,
            caption: captions::channel_caption(&prepared.artwork, &tags),
            media: prepared.media.clone(),
            media_kind: prepared.artwork.media_kind,
        };

        let message_id = self.sink.send(&message).await?;
        self.pushes
            .record_delivery(item.id, channel_id, Some(message_id), true, config.created_by)
            .await?;
        counter!("curator_deliveries_total", "result" => "success").increment(1);
        Ok(message_id)
    }

    async fn record_failure(&self, review_id: i64, channel_id: i64, config: &AutoPushConfig) {
        counter!("curator_deliveries_total", "result" => "failure").increment(1);
        if let Err(e) = self
            .pushes
            .record_delivery(review_id, channel_id, None, false, config.created_by)
            .await
        {
            error!("记录推送失败时发生错误: review={}: {}", review_id, e);
        }
    }

    fn rate_limit_wait(&self, error: &CuratorError) -> Duration {
        Duration::from_secs(error.retry_after().unwrap_or(1)) + self.settings.rate_limit_padding
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = JobSettings::from_config(&AutoPushSettings::default(), Some(9));
        assert_eq!(settings.tick_interval, Duration::from_secs(60));
        assert_eq!(settings.item_delay, Duration::from_millis(3000));
        assert_eq!(settings.decision_delay, Duration::from_millis(2000));
        assert_eq!(settings.owner_chat_id, Some(9));
    }

    #[test]
    fn test_summary_decided_ignores_skips() {
        let summary = RunSummary {
            passed: 2,
            rejected: 1,
            skipped: 5,
            not_found: 1,
            ..RunSummary::default()
        };
        assert_eq!(summary.decided(), 3);
    }
}
