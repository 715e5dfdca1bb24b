use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use curator_core::config::{AutoPushSettings, NameMapSettings};
use curator_core::{
    AutoPushConfig, AutoPushMode, AutoPushStatus, CuratorError, CuratorResult, DeliverySink,
    OutgoingMessage, WorkItemStatus,
};
use curator_dispatcher::{AutoPushJob, JobSettings, RunningConfigs};
use curator_domain::{PushService, QueueEngine, ReviewService, SitesManager};
use curator_infrastructure::InMemorySetStore;
use curator_namemap::{NameMapFactory, TagFormatterService};
use curator_testing_utils::{
    ArtworkBuilder, AutoPushConfigBuilder, MockAutoPushConfigRepository, MockPushRecordRepository,
    MockSite, MockTagConfigRepository, MockWorkItemRepository, MockWorkspaceRepository,
    RecordingDeliverySink, SinkResponse, WorkItemBuilder,
};

const CHANNEL: i64 = -100;
const OWNER: i64 = 555;

struct Harness {
    job: Arc<AutoPushJob>,
    configs: MockAutoPushConfigRepository,
    items: MockWorkItemRepository,
    pushes: MockPushRecordRepository,
    site: MockSite,
}

/// 工作空间1：规则 "cat"，频道 -100；工作空间2：有规则无频道
///
/// 作者2历史全部通过，作者3历史全部拒绝，作者4没有历史。
fn harness(sink: Arc<dyn DeliverySink>) -> Harness {
    harness_with(sink, MockAutoPushConfigRepository::new())
}

fn harness_with(sink: Arc<dyn DeliverySink>, configs: MockAutoPushConfigRepository) -> Harness {
    let items = MockWorkItemRepository::new();
    let workspaces = MockWorkspaceRepository::new();
    workspaces.add_workspace(1, Some("cat"), &[CHANNEL]);
    workspaces.add_workspace(2, Some("cat"), &[]);

    for (i, status) in [
        (0, WorkItemStatus::Pass),
        (1, WorkItemStatus::Pass),
        (2, WorkItemStatus::Pass),
    ] {
        items.insert(
            WorkItemBuilder::new()
                .with_workspace(1)
                .with_artwork(900 + i)
                .with_author(2)
                .with_status(status)
                .build(),
        );
    }
    for i in 0..3 {
        items.insert(
            WorkItemBuilder::new()
                .with_workspace(1)
                .with_artwork(950 + i)
                .with_author(3)
                .with_status(WorkItemStatus::Reject)
                .build(),
        );
    }

    let site = MockSite::new("pixiv");
    for (artwork_id, author_id) in [(1, 2), (2, 2), (3, 3), (4, 4)] {
        site.add_artwork(
            ArtworkBuilder::new(artwork_id)
                .with_author(author_id, "painter")
                .with_tags(&["cat", "blue"])
                .build(),
        );
    }

    let pushes = MockPushRecordRepository::new();
    let queue = Arc::new(QueueEngine::new(
        Arc::new(items.clone()),
        Arc::new(workspaces.clone()),
        Arc::new(pushes.clone()),
        Arc::new(InMemorySetStore::new()),
        SitesManager::new().with_site(Arc::new(site.clone())),
    ));
    let reviews = Arc::new(ReviewService::new(
        Arc::new(items.clone()),
        Arc::new(workspaces.clone()),
        queue,
    ));

    let tag_repo = Arc::new(MockTagConfigRepository::new());
    let factory = Arc::new(NameMapFactory::new(
        tag_repo.clone(),
        &NameMapSettings {
            base_path: "does-not-exist".to_string(),
            ..NameMapSettings::default()
        },
    ));
    let tags = Arc::new(TagFormatterService::new(tag_repo, factory));

    let job = Arc::new(AutoPushJob::new(
        Arc::new(configs.clone()),
        Arc::new(workspaces),
        reviews,
        Arc::new(PushService::new(Arc::new(pushes.clone()))),
        sink,
        tags,
        RunningConfigs::new(),
        JobSettings::from_config(&AutoPushSettings::without_delays(), Some(OWNER)),
    ));

    Harness {
        job,
        configs,
        items,
        pushes,
        site,
    }
}

fn due_config(mode: AutoPushMode) -> AutoPushConfig {
    AutoPushConfigBuilder::new()
        .with_workspace(1)
        .with_mode(mode)
        .with_status(AutoPushStatus::Enabled)
        .with_cron("0 * * * *")
        .with_next_run_time(Utc::now() - Duration::minutes(1))
        .build()
}

fn status_of(h: &Harness, artwork_id: i64) -> WorkItemStatus {
    h.items
        .all()
        .into_iter()
        .find(|i| i.workspace_id == 1 && i.artwork_id == artwork_id)
        .map(|i| i.status)
        .unwrap()
}

fn review_id_of(h: &Harness, artwork_id: i64) -> i64 {
    h.items
        .all()
        .into_iter()
        .find(|i| i.workspace_id == 1 && i.artwork_id == artwork_id)
        .map(|i| i.id)
        .unwrap()
}

#[tokio::test]
async fn test_batch_run_reviews_then_delivers() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let config = h.configs.insert(due_config(AutoPushMode::Batch));

    let summary = h.job.execute(config.clone()).await.unwrap().unwrap();
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.delivered, 2);

    assert_eq!(status_of(&h, 1), WorkItemStatus::Pass);
    assert_eq!(status_of(&h, 2), WorkItemStatus::Pass);
    assert_eq!(status_of(&h, 3), WorkItemStatus::Reject);
    assert_eq!(status_of(&h, 4), WorkItemStatus::Wait);

    let sent = sink.sent_to(CHANNEL);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].caption.contains("Tag: #cat #blue"));
    assert!(sink.sent_to(OWNER).is_empty());

    let record = h.pushes.get(review_id_of(&h, 1)).unwrap();
    assert!(record.status);
    assert_eq!(record.channel_id, CHANNEL);
    assert!(record.message_id.is_some());

    let after = h.configs.get(config.id).unwrap();
    assert_eq!(after.status, AutoPushStatus::Enabled);
    assert!(after.last_run_time.is_some());
    assert!(after.next_run_time.unwrap() > after.last_run_time.unwrap());
    assert!(!h.job.running().contains(config.id));
}

#[tokio::test]
async fn test_invalid_cron_disables_config_after_run() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let config = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_status(AutoPushStatus::Enabled)
            .with_cron("not a cron")
            .with_next_run_time(Utc::now() - Duration::minutes(1))
            .build(),
    );
    assert!(!config.run_once);

    let summary = h.job.execute(config.clone()).await.unwrap().unwrap();
    assert_eq!(summary.delivered, 2);

    let after = h.configs.get(config.id).unwrap();
    assert_eq!(after.status, AutoPushStatus::Disabled);
    assert!(after.last_run_time.is_some());
    assert!(!h.job.running().contains(config.id));

    // 禁用后不会再被调度
    assert!(h.job.tick().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_count_limits_decisions() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let config = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_review_count(1)
            .with_status(AutoPushStatus::Enabled)
            .build(),
    );

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.decided(), 1);
    let waiting = [1, 2, 3]
        .into_iter()
        .filter(|id| status_of(&h, *id) == WorkItemStatus::Wait)
        .count();
    assert_eq!(waiting, 2);
}

#[tokio::test]
async fn test_run_once_disables_config() {
    let h = harness(Arc::new(RecordingDeliverySink::new()));
    let config = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_status(AutoPushStatus::Enabled)
            .run_once()
            .build(),
    );

    h.job.execute(config.clone()).await.unwrap();
    assert_eq!(h.configs.get(config.id).unwrap().status, AutoPushStatus::Disabled);
}

#[tokio::test]
async fn test_batch_rate_limit_puts_item_back() {
    let sink = Arc::new(RecordingDeliverySink::with_script(vec![SinkResponse::RateLimited(0)]));
    let h = harness(sink.clone());
    let config = h.configs.insert(due_config(AutoPushMode::Batch));

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.delivery_failed, 0);
    assert_eq!(sink.attempts(), 3);
    assert_eq!(sink.sent_to(CHANNEL).len(), 2);
}

#[tokio::test]
async fn test_batch_rejected_delivery_is_recorded() {
    let sink = Arc::new(RecordingDeliverySink::with_script(vec![SinkResponse::Rejected]));
    let h = harness(sink.clone());
    let config = h.configs.insert(due_config(AutoPushMode::Batch));

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.delivery_failed, 1);

    let records = h.pushes.all();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| !r.status).count(), 1);
    assert!(records.iter().filter(|r| !r.status).all(|r| r.message_id.is_none()));
}

#[tokio::test]
async fn test_immediate_retries_network_errors() {
    let sink = Arc::new(RecordingDeliverySink::with_script(vec![
        SinkResponse::Network,
        SinkResponse::Network,
    ]));
    let h = harness(sink.clone());
    let config = h.configs.insert(due_config(AutoPushMode::Immediate));

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.delivered, 2);
    assert_eq!(sink.attempts(), 4);
    assert!(h.pushes.all().iter().all(|r| r.status));
}

#[tokio::test]
async fn test_immediate_gives_up_after_retries() {
    let sink = Arc::new(RecordingDeliverySink::with_script(vec![SinkResponse::Network; 4]));
    let h = harness(sink.clone());
    let config = h.configs.insert(due_config(AutoPushMode::Immediate));

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.delivery_failed, 1);
    assert_eq!(summary.delivered, 1);

    // 推送失败的作品保持通过状态，可以从历史重新加载
    let failed: Vec<_> = h.pushes.all().into_iter().filter(|r| !r.status).collect();
    assert_eq!(failed.len(), 1);
    let item = h.items.get(failed[0].review_id).unwrap();
    assert_eq!(item.status, WorkItemStatus::Pass);
}

#[tokio::test]
async fn test_missing_and_broken_artworks_are_marked() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let orphan = h.items.insert(
        WorkItemBuilder::new()
            .with_workspace(1)
            .with_artwork(50)
            .with_author(2)
            .build(),
    );
    h.site.break_artwork(2);
    let config = h.configs.insert(due_config(AutoPushMode::Immediate));

    let summary = h.job.execute(config).await.unwrap().unwrap();
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.passed, 1);

    assert_eq!(h.items.get(orphan.id).unwrap().status, WorkItemStatus::NotFound);
    assert_eq!(status_of(&h, 2), WorkItemStatus::Error);
    assert_eq!(sink.sent_to(CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_push_to_owner_mirrors_decisions() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let mut config = due_config(AutoPushMode::Batch);
    config.push_to_owner = true;
    let config = h.configs.insert(config);

    h.job.execute(config).await.unwrap();

    let owner = sink.sent_to(OWNER);
    assert_eq!(owner.len(), 6);
    let passed = owner
        .iter()
        .filter(|m| m.caption.starts_with("[自动审核通过]"))
        .count();
    let rejected = owner
        .iter()
        .filter(|m| m.caption.starts_with("[自动审核拒绝]"))
        .count();
    assert_eq!((passed, rejected), (2, 1));
    assert_eq!(sink.sent_to(CHANNEL).len(), 2);
}

#[tokio::test]
async fn test_missing_channel_fails_and_restores_status() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let mut config = due_config(AutoPushMode::Batch);
    config.workspace_id = 2;
    let config = h.configs.insert(config);

    let result = h.job.execute(config.clone()).await;
    assert!(matches!(result, Err(CuratorError::ChannelNotConfigured { work_id: 2 })));

    let after = h.configs.get(config.id).unwrap();
    assert_eq!(after.status, AutoPushStatus::Enabled);
    assert!(!h.job.running().contains(config.id));
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn test_execute_skips_when_already_running() {
    let h = harness(Arc::new(RecordingDeliverySink::new()));
    let config = h.configs.insert(due_config(AutoPushMode::Batch));

    let _guard = h.job.running().try_acquire(config.id).unwrap();
    assert!(h.job.execute(config.clone()).await.unwrap().is_none());
    assert_eq!(h.configs.get(config.id).unwrap().status, AutoPushStatus::Enabled);
}

#[tokio::test]
async fn test_recover_stale_running_configs() {
    let h = harness(Arc::new(RecordingDeliverySink::new()));
    let config = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_status(AutoPushStatus::Running)
            .build(),
    );

    assert_eq!(h.job.recover_stale().await.unwrap(), 1);
    let after = h.configs.get(config.id).unwrap();
    assert_eq!(after.status, AutoPushStatus::Enabled);
    assert!(after.next_run_time.is_some());
}

#[tokio::test]
async fn test_tick_runs_due_configs_only() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let due = h.configs.insert(due_config(AutoPushMode::Batch));
    let later = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_status(AutoPushStatus::Enabled)
            .with_next_run_time(Utc::now() + Duration::hours(1))
            .build(),
    );

    let handles = h.job.tick().await.unwrap();
    assert_eq!(handles.len(), 1);
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(h.configs.get(due.id).unwrap().last_run_time.is_some());
    assert!(h.configs.get(later.id).unwrap().last_run_time.is_none());
    assert_eq!(sink.sent_to(CHANNEL).len(), 2);
}

#[tokio::test]
async fn test_run_now_keeps_disabled_status() {
    let sink = Arc::new(RecordingDeliverySink::new());
    let h = harness(sink.clone());
    let config = h.configs.insert(
        AutoPushConfigBuilder::new()
            .with_workspace(1)
            .with_status(AutoPushStatus::Disabled)
            .build(),
    );

    h.job.run_now(config.id).await.unwrap().await.unwrap();
    assert_eq!(h.configs.get(config.id).unwrap().status, AutoPushStatus::Disabled);
    assert_eq!(sink.sent_to(CHANNEL).len(), 2);

    assert!(matches!(
        h.job.run_now(999).await,
        Err(CuratorError::ConfigNotFound { id: 999 })
    ));
}

/// 第一次发送时模拟操作员禁用配置
struct DisablingSink {
    inner: RecordingDeliverySink,
    configs: MockAutoPushConfigRepository,
    config_id: i64,
}

#[async_trait]
impl DeliverySink for DisablingSink {
    async fn send(&self, message: &OutgoingMessage) -> CuratorResult<i64> {
        self.configs.force_status(self.config_id, AutoPushStatus::Disabled);
        self.inner.send(message).await
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> CuratorResult<i64> {
        self.inner.send_text(chat_id, text).await
    }
}

#[tokio::test]
async fn test_operator_disable_during_run_is_kept() {
    let configs = MockAutoPushConfigRepository::new();
    let config = configs.insert(due_config(AutoPushMode::Immediate));
    let sink = Arc::new(DisablingSink {
        inner: RecordingDeliverySink::new(),
        configs: configs.clone(),
        config_id: config.id,
    });

    let h = harness_with(sink, configs);

    h.job.execute(config.clone()).await.unwrap();
    assert_eq!(h.configs.get(config.id).unwrap().status, AutoPushStatus::Disabled);
}
