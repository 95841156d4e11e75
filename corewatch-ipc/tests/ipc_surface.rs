//! Scenario coverage for the IPC router: channel whitelisting and a
//! representative request/response round-trip through `account.*`/`view.*`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use corewatch_config::JsonFileConfigStore;
use corewatch_ipc::{build_router, IpcSurface};
use corewatch_migration::MigrationEngine;
use corewatch_monitor::{ErrorLog, EventBus};
use corewatch_supervisor::{CrashReason, InstanceSupervisor, SupervisorConfig, WorkerHandle, WorkerSpawner};
use corewatch_switch::SwitchEngine;
use corewatch_types::{AccountId, Result};

struct NeverCrashHandle;

#[async_trait::async_trait]
impl WorkerHandle for NeverCrashHandle {
    fn pid(&self) -> Option<u32> {
        Some(1)
    }
    async fn sample_resources(&self) -> Result<(u64, f32)> {
        Ok((0, 0.0))
    }
    async fn probe_liveness(&mut self, _timeout_after: std::time::Duration) -> Result<()> {
        Ok(())
    }
    async fn request_close(&mut self) -> Result<()> {
        Ok(())
    }
    async fn reload(&mut self, _ignore_cache: bool) -> Result<()> {
        Ok(())
    }
    async fn load_url(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }
    async fn force_terminate(&mut self) -> Result<()> {
        Ok(())
    }
    async fn wait_crash(&mut self) -> CrashReason {
        std::future::pending::<CrashReason>().await
    }
}

struct NeverCrashSpawner;

#[async_trait::async_trait]
impl WorkerSpawner for NeverCrashSpawner {
    async fn spawn(
        &self,
        _account_id: &AccountId,
        _view_config: &corewatch_isolation::ViewSurfaceConfig,
        _proxy: &corewatch_isolation::AppliedProxy,
    ) -> Result<Box<dyn WorkerHandle>> {
        Ok(Box::new(NeverCrashHandle))
    }
}

fn build_app(tmp: &std::path::Path) -> axum::Router {
    let bus = Arc::new(EventBus::new(ErrorLog::new(tmp.join("errors.log"))));
    let config_store = Arc::new(JsonFileConfigStore::new(tmp.join("registry.json"), tmp.join("profiles"), bus.clone()));
    let supervisor =
        Arc::new(InstanceSupervisor::new(SupervisorConfig::default(), Arc::new(NeverCrashSpawner), tmp.join("profiles"), bus.clone()));
    let switch_engine = Arc::new(SwitchEngine::new(supervisor.clone(), bus.clone()));
    let migration_engine = Arc::new(MigrationEngine::new(tmp, tmp.join("registry.json"), bus.clone()));
    let surface = Arc::new(IpcSurface::new(config_store, supervisor, switch_engine, migration_engine, tmp.join("profiles"), bus));
    build_router(surface)
}

async fn post(app: &axum::Router, channel: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/ipc/{channel}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn unknown_channel_is_rejected_before_any_handler_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = post(&app, "account.explode", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "UnknownChannel");
}

#[tokio::test]
async fn create_then_list_then_switch_to_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, created) = post(&app, "account.create", serde_json::json!({ "name": "Alpha" })).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, list) = post(&app, "account.list", serde_json::Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Alpha");
    assert_eq!(list[0]["status"]["state"], "stopped");

    let (status, _) = post(&app, "view.switchTo", serde_json::json!({ "id": id })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, active) = post(&app, "view.active", serde_json::Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["account_id"], id);
}

#[tokio::test]
async fn account_get_for_missing_id_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = post(&app, "account.get", serde_json::json!({ "id": "acct-missing" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "NotFound");
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = post(&app, "account.get", serde_json::json!({ "nope": true })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "ValidationError");
}

#[tokio::test]
async fn migration_status_reports_not_completed_on_a_fresh_install() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = post(&app, "migration.status", serde_json::Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], false);
}
