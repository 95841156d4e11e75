//! Scenario coverage for the legacy-layout upgrade.

use std::sync::Arc;

use corewatch_migration::MigrationEngine;
use corewatch_monitor::{ErrorLog, EventBus};
use corewatch_types::registry::schema_version;

fn legacy_registry_json() -> serde_json::Value {
    serde_json::json!({
        "version": schema_version::PRE_MIGRATION,
        "accounts": [
            {
                "id": "acct-b",
                "name": "Bravo",
                "note": "second window",
                "sessionDir": "account_acct-b",
                "window": { "x": 400, "y": 0, "width": 900, "height": 700 },
            },
            {
                "id": "acct-a",
                "name": "Alpha",
                "note": "",
                "sessionDir": "account_acct-a",
                "window": { "x": 0, "y": 0, "width": 900, "height": 700 },
            },
        ],
    })
}

async fn write_legacy_fixture(data_root: &std::path::Path) -> std::path::PathBuf {
    tokio::fs::create_dir_all(data_root).await.unwrap();
    tokio::fs::create_dir_all(data_root.join("session")).await.unwrap();
    let registry_path = data_root.join("registry.json");
    tokio::fs::write(&registry_path, serde_json::to_vec_pretty(&legacy_registry_json()).unwrap())
        .await
        .unwrap();
    registry_path
}

fn make_bus(data_root: &std::path::Path) -> Arc<EventBus> {
    Arc::new(EventBus::new(ErrorLog::new(data_root.join("errors.log"))))
}

#[tokio::test]
async fn converts_legacy_registry_and_orders_by_prior_window_position() {
    let tmp = tempfile::tempdir().unwrap();
    let registry_path = write_legacy_fixture(tmp.path()).await;
    let bus = make_bus(tmp.path());

    let engine = MigrationEngine::new(tmp.path(), registry_path.clone(), bus);
    let outcome = engine.run().await.unwrap();

    assert!(outcome.ran);
    assert_eq!(outcome.migrated_count, 2);
    assert!(tokio::fs::metadata(engine.sentinel_path()).await.is_ok());

    let bytes = tokio::fs::read(&registry_path).await.unwrap();
    let doc: corewatch_types::RegistryDocument = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(doc.version, schema_version::POST_MIGRATION);
    assert_eq!(doc.migrated_from.as_deref(), Some(schema_version::PRE_MIGRATION));

    let mut records = doc.sorted_by_order();
    assert_eq!(records.len(), 2);
    // acct-a had the leftmost/topmost window, so it sorts first despite
    // appearing second in the legacy array.
    assert_eq!(records.remove(0).name, "Alpha");
    assert_eq!(records.remove(0).name, "Bravo");

    let backups: Vec<_> = std::fs::read_dir(engine.backup_dir()).unwrap().collect();
    assert_eq!(backups.len(), 2, "expect one registry backup and one geometry audit file");
}

#[tokio::test]
async fn second_run_after_success_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let registry_path = write_legacy_fixture(tmp.path()).await;
    let bus = make_bus(tmp.path());
    let engine = MigrationEngine::new(tmp.path(), registry_path.clone(), bus);

    let first = engine.run().await.unwrap();
    assert!(first.ran);

    let sealed_bytes = tokio::fs::read(&registry_path).await.unwrap();
    let second = engine.run().await.unwrap();
    assert!(!second.ran);
    assert_eq!(second.migrated_count, 0);

    // The registry must be untouched by the no-op second run.
    let bytes_after = tokio::fs::read(&registry_path).await.unwrap();
    assert_eq!(sealed_bytes, bytes_after);
}

#[tokio::test]
async fn current_layout_with_no_legacy_signal_is_left_alone() {
    let tmp = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(tmp.path()).await.unwrap();
    let registry_path = tmp.path().join("registry.json");
    let current_doc = corewatch_types::RegistryDocument::empty();
    tokio::fs::write(&registry_path, serde_json::to_vec_pretty(&current_doc).unwrap()).await.unwrap();
    let bus = make_bus(tmp.path());

    let engine = MigrationEngine::new(tmp.path(), registry_path.clone(), bus);
    let outcome = engine.run().await.unwrap();

    assert!(!outcome.ran);
    assert!(tokio::fs::metadata(engine.sentinel_path()).await.is_err());
}

#[tokio::test]
async fn a_record_failing_validation_aborts_without_sealing() {
    let tmp = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(tmp.path()).await.unwrap();
    let registry_path = tmp.path().join("registry.json");
    let broken = serde_json::json!({
        "version": schema_version::PRE_MIGRATION,
        "accounts": [
            { "id": "acct-bad", "name": "", "window": { "x": 0, "y": 0 } },
        ],
    });
    tokio::fs::write(&registry_path, serde_json::to_vec_pretty(&broken).unwrap()).await.unwrap();
    let bus = make_bus(tmp.path());

    let engine = MigrationEngine::new(tmp.path(), registry_path.clone(), bus);
    let result = engine.run().await;

    assert!(result.is_err());
    assert!(tokio::fs::metadata(engine.sentinel_path()).await.is_err());
    // Backup still happens before transform/validate, so the original is
    // never left without a copy even on a failed attempt.
    assert!(std::fs::read_dir(engine.backup_dir()).unwrap().count() > 0);
}
