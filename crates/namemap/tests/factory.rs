use std::sync::Arc;

use curator_core::config::NameMapSettings;
use curator_core::{TagConfig, TagConfigRepository};
use curator_namemap::{NameMapFactory, TagFormatterService};
use curator_testing_utils::{name_map_root, write_name_map, ArtworkBuilder, MockTagConfigRepository};
use serde_json::json;
use tempfile::TempDir;

fn settings(root: &TempDir, capacity: usize) -> NameMapSettings {
    NameMapSettings {
        base_path: root.path().display().to_string(),
        dir: "name_map".to_string(),
        cache_capacity: capacity,
        watch: false,
    }
}

async fn bind(repo: &MockTagConfigRepository, workspace_id: Option<i64>, key: &str) -> TagConfig {
    repo.create(&TagConfig::new(workspace_id, key)).await.unwrap()
}

fn alpha() -> serde_json::Value {
    json!({"c1": {"name": ["Alpha", "阿尔法"]}})
}

#[tokio::test]
async fn test_workspace_config_then_global_default() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    write_name_map(
        root.path(),
        "name_map/beta.json",
        &json!({"c2": {"name": ["Beta"]}}),
    );

    let repo = MockTagConfigRepository::new();
    bind(&repo, Some(1), "alpha").await;
    let global = bind(&repo, None, "beta").await;
    repo.set_global_default(global.id).await.unwrap();

    let factory = NameMapFactory::new(Arc::new(repo.clone()), &settings(&root, 8));

    let own = factory.get_instance(Some(1)).await.unwrap().unwrap();
    assert_eq!(own.filter_character_tags(&["Alpha", "other"]), "#Alpha #阿尔法");

    let fallback = factory.get_instance(Some(2)).await.unwrap().unwrap();
    assert_eq!(fallback.filter_character_tags(&["beta"]), "#Beta");

    let global = factory.get_instance(None).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&fallback, &global));
    assert_eq!(factory.load_count(), 2);
}

#[tokio::test]
async fn test_missing_file_falls_back_to_none() {
    let root = name_map_root();
    let repo = MockTagConfigRepository::new();
    bind(&repo, Some(1), "missing").await;

    let factory = NameMapFactory::new(Arc::new(repo), &settings(&root, 8));
    assert!(factory.get_instance(Some(1)).await.unwrap().is_none());
    assert_eq!(factory.load_count(), 0);
}

#[tokio::test]
async fn test_global_fallback_is_remembered_per_workspace() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    let repo = MockTagConfigRepository::new();
    let global = bind(&repo, None, "alpha").await;
    repo.set_global_default(global.id).await.unwrap();
    bind(&repo, Some(3), "missing").await;

    let factory = NameMapFactory::new(Arc::new(repo.clone()), &settings(&root, 8));
    for _ in 0..100 {
        let instance = factory.get_instance(Some(2)).await.unwrap().unwrap();
        assert_eq!(instance.filter_character_tags(&["alpha"]), "#Alpha #阿尔法");
    }
    assert_eq!(repo.active_lookups(), 1);

    for _ in 0..10 {
        assert!(factory.get_instance(Some(3)).await.unwrap().is_some());
    }
    assert_eq!(repo.active_lookups(), 2);
    assert_eq!(factory.load_count(), 1);

    let keys: Vec<String> = factory.cache_info().await.into_iter().map(|e| e.key).collect();
    assert_eq!(
        keys,
        vec!["_global_default", "workspace:2:_global", "workspace:3:_global"]
    );

    // 新增专属配置后清空缓存即可生效
    write_name_map(
        root.path(),
        "name_map/beta.json",
        &json!({"c2": {"name": ["Beta"]}}),
    );
    bind(&repo, Some(2), "beta").await;
    factory.clear_cache().await;
    let own = factory.get_instance(Some(2)).await.unwrap().unwrap();
    assert_eq!(own.filter_character_tags(&["beta"]), "#Beta");
    assert_eq!(repo.active_lookups(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_load_once() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    let repo = MockTagConfigRepository::new();
    bind(&repo, Some(1), "alpha").await;

    let factory = Arc::new(NameMapFactory::new(Arc::new(repo), &settings(&root, 8)));
    let first = factory.clone();
    let second = factory.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.get_instance(Some(1)).await }),
        tokio::spawn(async move { second.get_instance(Some(1)).await }),
    );
    let a = a.unwrap().unwrap().unwrap();
    let b = b.unwrap().unwrap().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(factory.load_count(), 1);
}

#[tokio::test]
async fn test_clear_cache_reloads() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    let repo = MockTagConfigRepository::new();
    bind(&repo, Some(1), "alpha").await;

    let factory = NameMapFactory::new(Arc::new(repo), &settings(&root, 8));
    factory.get_instance(Some(1)).await.unwrap();
    factory.get_instance(Some(1)).await.unwrap();
    assert_eq!(factory.load_count(), 1);
    assert_eq!(factory.cache_info().await.len(), 1);

    write_name_map(
        root.path(),
        "name_map/alpha.json",
        &json!({"c1": {"name": ["Alpha", "Alfa"]}}),
    );
    factory.clear_cache().await;
    assert!(factory.cache_info().await.is_empty());

    let reloaded = factory.get_instance(Some(1)).await.unwrap().unwrap();
    assert_eq!(reloaded.filter_character_tags(&["alpha"]), "#Alpha #Alfa");
    assert_eq!(factory.load_count(), 2);
}

#[tokio::test]
async fn test_least_recently_used_entry_is_evicted() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    let repo = MockTagConfigRepository::new();
    for workspace_id in 1..=3 {
        bind(&repo, Some(workspace_id), "alpha").await;
    }

    let factory = NameMapFactory::new(Arc::new(repo), &settings(&root, 2));
    factory.get_instance(Some(1)).await.unwrap();
    factory.get_instance(Some(2)).await.unwrap();
    factory.get_instance(Some(1)).await.unwrap();
    factory.get_instance(Some(3)).await.unwrap();

    let keys: Vec<String> = factory.cache_info().await.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["workspace:1:alpha", "workspace:3:alpha"]);
}

#[tokio::test]
async fn test_load_by_key_and_available_keys() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    write_name_map(root.path(), "name_map/notes.txt", &json!({}));

    let factory = NameMapFactory::new(
        Arc::new(MockTagConfigRepository::new()),
        &settings(&root, 8),
    );
    assert_eq!(factory.list_available_keys(), vec!["alpha"]);
    assert_eq!(factory.load_by_key("alpha").await.unwrap().len(), 1);
    assert!(factory.load_by_key("gamma").await.is_err());
}

#[tokio::test]
async fn test_format_tags_and_admin_operations() {
    let root = name_map_root();
    write_name_map(root.path(), "name_map/alpha.json", &alpha());
    let repo = MockTagConfigRepository::new();
    let factory = Arc::new(NameMapFactory::new(Arc::new(repo.clone()), &settings(&root, 8)));
    let service = TagFormatterService::new(Arc::new(repo.clone()), factory.clone());

    let artwork = ArtworkBuilder::new(1).with_tags(&["Alpha", "风景"]).build();
    assert_eq!(service.format_tags(&artwork, true, Some(1)).await, "#Alpha #风景");
    assert_eq!(service.format_tags(&artwork, false, Some(1)).await, "#Alpha #风景");

    let config = service
        .create_config(Some(1), "alpha", None, Some("测试".to_string()), 10, false)
        .await
        .unwrap();
    assert_eq!(service.format_tags(&artwork, true, Some(1)).await, "#Alpha #阿尔法");

    assert!(service.set_active(config.id, false).await.unwrap());
    assert!(factory.cache_info().await.is_empty());
    assert_eq!(service.format_tags(&artwork, true, Some(1)).await, "#Alpha #风景");

    let global = service
        .create_config(None, "alpha", None, None, 0, true)
        .await
        .unwrap();
    assert!(global.is_global_default);
    assert_eq!(service.format_tags(&artwork, true, None).await, "#Alpha #阿尔法");

    assert!(service.delete_config(global.id).await.unwrap());
    assert!(!service.delete_config(global.id).await.unwrap());
    assert_eq!(service.format_tags(&artwork, true, None).await, "#Alpha #风景");
    assert_eq!(service.list_configs(Some(1)).await.unwrap().len(), 1);
}
