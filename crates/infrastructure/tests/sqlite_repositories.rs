use chrono::Utc;
use curator_core::{
    Artwork, Author, AutoPushConfig, AutoPushConfigRepository, AutoPushMode, AutoPushStatus,
    MediaKind, Page, PushRecord, PushRecordRepository, SearchRule, SiteService, TagConfig,
    TagConfigRepository, WorkItem, WorkItemRepository, WorkItemStatus, Workspace,
    WorkspaceRepository,
};
use curator_infrastructure::{
    DatabaseManager, MirrorSite, SqliteAutoPushConfigRepository, SqlitePushRecordRepository,
    SqliteTagConfigRepository, SqliteWorkItemRepository, SqliteWorkspaceRepository,
};

#[tokio::test]
async fn test_work_item_create_pending_is_idempotent() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteWorkItemRepository::new(db.pool().clone());

    let created = repo
        .create_pending(1, "pixiv", &[(10, Some(100)), (11, None)], Some(7))
        .await
        .unwrap();
    assert_eq!(created, 2);

    let created = repo
        .create_pending(1, "pixiv", &[(10, Some(100)), (12, Some(100))], Some(7))
        .await
        .unwrap();
    assert_eq!(created, 1);

    let ids = repo
        .list_artwork_ids(1, "pixiv", Page::first(10))
        .await
        .unwrap();
    assert_eq!(ids, vec![10, 11, 12]);

    let second_page = repo
        .list_artwork_ids(1, "pixiv", Page::new(2, 2))
        .await
        .unwrap();
    assert_eq!(second_page, vec![12]);
}

#[tokio::test]
async fn test_work_item_update_and_statistics() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteWorkItemRepository::new(db.pool().clone());

    repo.create_pending(1, "pixiv", &[(1, Some(9)), (2, Some(9)), (3, Some(9)), (4, Some(8))], None)
        .await
        .unwrap();

    let mut item = repo.find(1, "pixiv", 1).await.unwrap().unwrap();
    item.transition_to(WorkItemStatus::Pass, false, Some(5)).unwrap();
    repo.update(&item).await.unwrap();

    let mut item = repo.find(1, "pixiv", 2).await.unwrap().unwrap();
    item.transition_to(WorkItemStatus::Reject, false, None).unwrap();
    item.ext.insert("note".to_string(), serde_json::json!("x"));
    repo.update(&item).await.unwrap();

    let stats = repo.status_statistics(1, "pixiv", 9).await.unwrap();
    assert_eq!(stats.pass_count, 1);
    assert_eq!(stats.reject_count, 1);

    let stats = repo.status_statistics(1, "pixiv", 404).await.unwrap();
    assert_eq!(stats.total(), 0);

    let reloaded = repo.get_by_id(item.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, WorkItemStatus::Reject);
    assert_eq!(reloaded.ext.get("note"), Some(&serde_json::json!("x")));

    let waiting = repo
        .list_ids_by_status(1, WorkItemStatus::Wait, Page::first(100))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 2);
    assert_eq!(repo.count_by_status(1, WorkItemStatus::Wait).await.unwrap(), 2);
}

#[tokio::test]
async fn test_work_item_missing_update_fails() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteWorkItemRepository::new(db.pool().clone());

    let mut item = WorkItem::new(1, "pixiv", 1, None, None);
    item.id = 999;
    let err = repo.update(&item).await.unwrap_err();
    assert!(err.is_not_found());

    let created = repo.create(&WorkItem::new(2, "pixiv", 1, None, None)).await.unwrap();
    assert_eq!(repo.list_by_artwork_id(1).await.unwrap().len(), 1);
    repo.delete(created.id).await.unwrap();
    assert!(repo.get_by_id(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_workspace_rule_and_channels() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteWorkspaceRepository::new(db.pool().clone());

    let workspace = repo.create(&Workspace::new("风景", Some(1))).await.unwrap();
    assert!(repo.get_rule(workspace.id).await.unwrap().is_none());

    repo.save_rule(&SearchRule::new(workspace.id, "sky")).await.unwrap();
    let rule = repo.save_rule(&SearchRule::new(workspace.id, "sea")).await.unwrap();
    assert_eq!(rule.search_text, "sea");

    repo.add_channel(workspace.id, -100).await.unwrap();
    repo.add_channel(workspace.id, -100).await.unwrap();
    let channels = repo.list_channels(workspace.id).await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].channel_id, -100);
}

#[tokio::test]
async fn test_auto_push_config_round_trip() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteAutoPushConfigRepository::new(db.pool().clone());

    let config = AutoPushConfig::new(1, "nightly", AutoPushMode::Batch, "0 0 * * *", 20);
    let mut created = repo.create(&config).await.unwrap();
    assert!(created.id > 0);

    created.status = AutoPushStatus::Enabled;
    created.next_run_time = Some(Utc::now());
    repo.update(&created).await.unwrap();

    let enabled = repo.list_by_status(AutoPushStatus::Enabled).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].mode, AutoPushMode::Batch);
    assert_eq!(enabled[0].review_count, 20);

    assert!(repo.delete(created.id).await.unwrap());
    assert!(!repo.delete(created.id).await.unwrap());
}

#[tokio::test]
async fn test_push_record_upsert_and_delivered() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqlitePushRecordRepository::new(db.pool().clone());

    repo.upsert(&PushRecord::new(1, -100, None, false)).await.unwrap();
    repo.upsert(&PushRecord::new(2, -100, Some(55), true)).await.unwrap();

    let delivered = repo.delivered_review_ids(&[1, 2, 3]).await.unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(delivered.contains(&2));

    let updated = repo.upsert(&PushRecord::new(1, -100, Some(56), true)).await.unwrap();
    assert_eq!(updated.message_id, Some(56));
    assert!(repo.get_by_review_id(1).await.unwrap().unwrap().status);
}

#[tokio::test]
async fn test_tag_config_global_default_is_unique() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let repo = SqliteTagConfigRepository::new(db.pool().clone());

    let first = repo.create(&TagConfig::new(None, "genshin")).await.unwrap();
    let second = repo.create(&TagConfig::new(None, "arknights")).await.unwrap();
    let mut scoped = TagConfig::new(Some(3), "blue_archive");
    scoped.priority = 5;
    repo.create(&scoped).await.unwrap();

    assert!(repo.set_global_default(first.id).await.unwrap());
    assert!(repo.set_global_default(second.id).await.unwrap());
    assert!(!repo.set_global_default(999).await.unwrap());

    let default = repo.get_global_default().await.unwrap().unwrap();
    assert_eq!(default.config_key, "arknights");

    assert_eq!(repo.list_by_workspace(None).await.unwrap().len(), 2);
    let active = repo.get_active(Some(3)).await.unwrap().unwrap();
    assert_eq!(active.config_key, "blue_archive");
}

#[tokio::test]
async fn test_mirror_site_search_and_lookup() {
    let db = DatabaseManager::in_memory().await.unwrap();
    let site = MirrorSite::new("pixiv", "Pixiv", db.pool().clone());

    for (id, tags, author) in [(1, vec!["sky", "sea"], 10), (2, vec!["sky"], 11), (3, vec!["forest"], 10)] {
        let artwork = Artwork {
            site_key: "pixiv".to_string(),
            site_name: "Pixiv".to_string(),
            artwork_id: id,
            title: format!("work {id}"),
            tags: tags.into_iter().map(String::from).collect(),
            author: Author {
                id: author,
                name: format!("author {author}"),
                url: String::new(),
            },
            created_at: None,
            media_kind: MediaKind::Static,
            url: String::new(),
        };
        site.upsert_artwork(&artwork, &[]).await.unwrap();
    }

    let rule = SearchRule::new(1, "sky");
    let ids = site.search_artwork_ids(&rule, Page::first(10)).await.unwrap();
    assert_eq!(ids, vec![1, 2]);

    let mut pattern = SearchRule::new(1, "^for");
    pattern.is_pattern = true;
    assert_eq!(site.search_artwork_ids(&pattern, Page::first(10)).await.unwrap(), vec![3]);
    assert!(site.search_artwork_ids(&rule, Page::new(2, 10)).await.unwrap().is_empty());

    let authors = site.author_ids(&[1, 2, 404]).await.unwrap();
    assert_eq!(authors.get(&1), Some(&10));
    assert_eq!(authors.get(&2), Some(&11));
    assert!(!authors.contains_key(&404));

    let artwork = site.get_artwork(3).await.unwrap();
    assert_eq!(artwork.tags, vec!["forest".to_string()]);
    assert!(site.get_artwork(404).await.unwrap_err().is_not_found());
    assert!(site.get_artwork_media(1).await.unwrap().is_empty());
}
