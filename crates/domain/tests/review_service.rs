use std::sync::Arc;

use curator_core::{AutoReviewDecision, CuratorError, WorkItemStatus};
use curator_domain::{PushService, QueueEngine, ReviewService, SitesManager};
use curator_infrastructure::InMemorySetStore;
use curator_testing_utils::{
    MockPushRecordRepository, MockWorkItemRepository, MockWorkspaceRepository, WorkItemBuilder,
};

fn service() -> (ReviewService, MockWorkItemRepository) {
    let items = MockWorkItemRepository::new();
    let workspaces = MockWorkspaceRepository::new();
    workspaces.add_workspace(1, Some("x"), &[]);
    workspaces.add_workspace(2, Some("y"), &[]);

    let queue = Arc::new(QueueEngine::new(
        Arc::new(items.clone()),
        Arc::new(workspaces.clone()),
        Arc::new(MockPushRecordRepository::new()),
        Arc::new(InMemorySetStore::new()),
        SitesManager::new(),
    ));
    let reviews = ReviewService::new(Arc::new(items.clone()), Arc::new(workspaces), queue);
    (reviews, items)
}

fn seed_author(items: &MockWorkItemRepository, author_id: i64, statuses: &[WorkItemStatus]) {
    for (i, status) in statuses.iter().enumerate() {
        items.insert(
            WorkItemBuilder::new()
                .with_workspace(1)
                .with_artwork(author_id * 100 + i as i64)
                .with_author(author_id)
                .with_status(*status)
                .build(),
        );
    }
}

#[tokio::test]
async fn test_try_auto_review_thresholds() {
    let (reviews, items) = service();
    use WorkItemStatus::*;

    seed_author(&items, 1, &[Pass, Pass]);
    seed_author(&items, 2, &[Pass, Pass, Reject, Reject]);
    seed_author(&items, 3, &[Pass, Reject, Reject, Wait, Error]);

    assert!(reviews.try_auto_review(1, "pixiv", 1).await.unwrap().is_none());

    let result = reviews.try_auto_review(1, "pixiv", 2).await.unwrap().unwrap();
    assert_eq!(result.decision, AutoReviewDecision::Pass);
    assert_eq!(result.statistics.pass_count, 2);

    let result = reviews.try_auto_review(1, "pixiv", 3).await.unwrap().unwrap();
    assert_eq!(result.decision, AutoReviewDecision::Reject);

    // 其他工作空间的历史不计入
    assert!(reviews.try_auto_review(2, "pixiv", 2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_move_to_marks_original_and_copies() {
    let (reviews, items) = service();
    let item = items.insert(
        WorkItemBuilder::new()
            .with_workspace(1)
            .with_artwork(77)
            .with_status(WorkItemStatus::Pass)
            .build(),
    );

    let copy = reviews.move_to(item.id, 2, Some(9)).await.unwrap();
    assert_eq!(copy.workspace_id, 2);
    assert_eq!(copy.artwork_id, 77);
    assert_eq!(copy.status, WorkItemStatus::Pass);

    let original = items.get(item.id).unwrap();
    assert_eq!(original.status, WorkItemStatus::Move);
    assert_eq!(original.ext.get("move_to"), Some(&serde_json::json!(2)));

    let err = reviews.move_to(copy.id, 404, None).await.unwrap_err();
    assert!(matches!(err, CuratorError::WorkNotFound { id: 404 }));
}

#[tokio::test]
async fn test_move_back_restores_original_record() {
    let (reviews, items) = service();
    let item = items.insert(
        WorkItemBuilder::new()
            .with_workspace(1)
            .with_artwork(78)
            .with_status(WorkItemStatus::Reject)
            .build(),
    );

    let copy = reviews.move_to(item.id, 2, Some(9)).await.unwrap();
    let back = reviews.move_to(copy.id, 1, Some(9)).await.unwrap();
    assert_eq!(back.id, item.id);
    assert_eq!(back.status, WorkItemStatus::Reject);

    let original = items.get(item.id).unwrap();
    assert_eq!(original.status, WorkItemStatus::Reject);
    assert!(original.ext.get("move_to").is_none());
    assert_eq!(original.ext.get("move_from"), Some(&serde_json::json!(2)));
    assert_eq!(items.get(copy.id).unwrap().status, WorkItemStatus::Move);
    assert_eq!(items.count(), 2);

    // 恢复后的记录可以继续流转
    let reverted = reviews.revert(item.id, None).await.unwrap();
    assert_eq!(reverted.status, WorkItemStatus::Wait);
}

#[tokio::test]
async fn test_record_manual_decision_upserts() {
    let (reviews, items) = service();

    let created = reviews
        .record_manual_decision(1, "pixiv", 5, WorkItemStatus::Pass, Some(1))
        .await
        .unwrap();
    assert_eq!(created.status, WorkItemStatus::Pass);
    assert_eq!(items.count(), 1);

    let updated = reviews
        .record_manual_decision(1, "pixiv", 5, WorkItemStatus::Reject, Some(1))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.status, WorkItemStatus::Reject);
    assert_eq!(items.count(), 1);

    assert_eq!(reviews.find_by_artwork_id(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_transitions_are_rejected() {
    let (reviews, items) = service();
    let item = items.insert(
        WorkItemBuilder::new()
            .with_workspace(1)
            .with_status(WorkItemStatus::NotFound)
            .build(),
    );

    let err = reviews.revert(item.id, None).await.unwrap_err();
    assert!(matches!(err, CuratorError::InvalidTransition { .. }));
    assert!(reviews.get(404).await.unwrap_err().is_not_found());

    reviews.remove(item.id).await.unwrap();
    assert_eq!(items.count(), 0);
}

#[tokio::test]
async fn test_record_delivery_updates_existing_record() {
    let repo = MockPushRecordRepository::new();
    let pushes = PushService::new(Arc::new(repo.clone()));

    let first = pushes.record_delivery(1, -100, None, false, Some(2)).await.unwrap();
    let second = pushes.record_delivery(1, -100, Some(88), true, Some(3)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(repo.all().len(), 1);
    assert_eq!(second.message_id, Some(88));
    assert!(second.status);
    assert_eq!(second.created_by, Some(2));
    assert_eq!(second.updated_by, Some(3));
}
