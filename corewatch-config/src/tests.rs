use std::sync::Arc;

use corewatch_monitor::{ErrorLog, EventBus};
use corewatch_types::{
    AccountDraft, AccountPatch, CoreError, ProxyProtocol, ProxySettings, TranslationEngine, TranslationSettings,
};

use crate::{ConfigStore, JsonFileConfigStore};

fn store(dir: &tempfile::TempDir) -> JsonFileConfigStore {
    let bus = Arc::new(EventBus::new(ErrorLog::new(dir.path().join("errors.log"))));
    JsonFileConfigStore::new(dir.path().join("registry.json"), dir.path().join("profiles"), bus)
}

#[tokio::test]
async fn create_get_delete_is_identity_on_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    let before = store.load_all().await.unwrap();
    assert!(before.is_empty());

    let record = store
        .create(AccountDraft { name: "A".to_string(), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(record.order, 0);
    assert!(store.get(&record.id).await.unwrap().is_some());

    store.delete(&record.id, true).await.unwrap();
    let after = store.load_all().await.unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn create_assigns_next_highest_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    let a = store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();
    let b = store.create(AccountDraft { name: "B".to_string(), ..Default::default() }).await.unwrap();
    assert_eq!(a.order, 0);
    assert_eq!(b.order, 1);
}

#[tokio::test]
async fn update_empty_patch_is_a_noop_up_to_last_active_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let record = store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();

    let updated = store.update(&record.id, AccountPatch::default()).await.unwrap();
    assert_eq!(updated.name, record.name);
    assert_eq!(updated.order, record.order);
    assert_eq!(updated.proxy, record.proxy);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let bogus = corewatch_types::AccountId::generate();
    let err = store.update(&bogus, AccountPatch::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn reorder_preserves_current_order_when_given_the_existing_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let a = store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();
    let b = store.create(AccountDraft { name: "B".to_string(), ..Default::default() }).await.unwrap();

    let ids: Vec<_> = store.load_all().await.unwrap().into_iter().map(|r| r.id).collect();
    store.reorder(ids).await.unwrap();

    let after = store.load_all().await.unwrap();
    assert_eq!(after[0].id, a.id);
    assert_eq!(after[1].id, b.id);
}

#[tokio::test]
async fn reorder_rejects_a_non_permutation() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();

    let bogus = corewatch_types::AccountId::generate();
    let err = store.reorder(vec![bogus]).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationError { .. }));
}

#[tokio::test]
async fn validation_errors_compose_across_every_violated_rule() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    let draft = AccountDraft {
        name: "".to_string(),
        proxy: Some(ProxySettings { enabled: true, protocol: None, host: Some("".to_string()), port: Some(0), ..Default::default() }),
        translation: Some(TranslationSettings {
            enabled: true,
            target_language: Some("".to_string()),
            engine: None,
            api_key: Some("".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let err = store.create(draft).await.unwrap_err();
    match err {
        CoreError::ValidationError { errors } => assert!(errors.len() >= 5),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[tokio::test]
async fn proxy_disabled_suppresses_validation_even_with_stale_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let draft = AccountDraft {
        name: "A".to_string(),
        proxy: Some(ProxySettings {
            enabled: false,
            protocol: Some(ProxyProtocol::Http),
            host: Some("".to_string()),
            port: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    };
    store.create(draft).await.unwrap();
}

#[tokio::test]
async fn translation_google_with_empty_key_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let draft = AccountDraft {
        name: "A".to_string(),
        translation: Some(TranslationSettings {
            enabled: true,
            target_language: Some("en".to_string()),
            engine: Some(TranslationEngine::Google),
            api_key: None,
            ..Default::default()
        }),
        ..Default::default()
    };
    store.create(draft).await.unwrap();
}

#[tokio::test]
async fn delete_without_retain_storage_removes_the_partition_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let record = store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();

    let partition = store.partition_path(&record.id);
    tokio::fs::create_dir_all(&partition).await.unwrap();
    tokio::fs::write(partition.join("cookies"), b"x").await.unwrap();

    store.delete(&record.id, false).await.unwrap();
    assert!(!partition.exists());
}

#[tokio::test]
async fn delete_with_retain_storage_keeps_the_partition_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let record = store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();

    let partition = store.partition_path(&record.id);
    tokio::fs::create_dir_all(&partition).await.unwrap();

    store.delete(&record.id, true).await.unwrap();
    assert!(partition.exists());
}

#[tokio::test]
async fn registry_file_is_written_atomically_via_temp_and_rename() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.create(AccountDraft { name: "A".to_string(), ..Default::default() }).await.unwrap();

    assert!(store.registry_path().exists());
    assert!(!store.registry_path().with_extension("json.tmp").exists());
}

#[tokio::test]
async fn a_corrupt_registry_file_falls_back_to_an_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    tokio::fs::write(store.registry_path(), b"not json").await.unwrap();

    let records = store.load_all().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn sidebar_width_is_clamped_to_the_configured_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.set_sidebar_width(10_000).await.unwrap();
    let global = store.global_state().await.unwrap();
    assert_eq!(global.sidebar_width, corewatch_types::SIDEBAR_WIDTH_MAX);
}
