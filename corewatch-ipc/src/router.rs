//! The axum router the shell talks to: one `POST /ipc/:channel` endpoint
//! dispatching by channel name, plus a `GET /ipc/notifications`
//! stream relaying the bus's shell-facing [`Notification`]s. Built the way
//! the dependency stack builds its own HTTP surfaces — a `Router` keyed by
//! path, state carried through `axum::extract::State`.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;

use corewatch_monitor::Notification;

use crate::channel::is_whitelisted;
use crate::error::{IpcError, IpcErrorPayload, UnknownChannel};
use crate::surface::IpcSurface;
use crate::types::{
    AccountDeleteRequest, AccountIdRequest, AccountReorderRequest, AccountUpdateRequest, InstanceProxyUpdateRequest,
    ViewLoadUrlRequest, ViewReloadRequest, ViewSwitchToIndexRequest,
};

/// Build the IPC router over a shared [`IpcSurface`].
pub fn build_router(surface: Arc<IpcSurface>) -> Router {
    Router::new()
        .route("/ipc/{channel}", post(dispatch))
        .route("/ipc/notifications", get(notifications))
        .layer(TraceLayer::new_for_http())
        .with_state(surface)
}

fn ok<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

fn ok_empty() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn bad_request(channel: &str, err: serde_json::Error) -> Response {
    let payload = IpcErrorPayload { category: "ValidationError", message: format!("{channel}: malformed request body: {err}") };
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

/// Parse `body` as the request type `T` the matched channel expects. An
/// empty body decodes as a zero-field/default-field struct only if `T`
/// itself tolerates `null`/`{}` — channels that need an id never accept an
/// empty body and this surfaces as a `ValidationError`.
fn parse<T: serde::de::DeserializeOwned>(channel: &str, body: &Bytes) -> Result<T, Response> {
    let value: serde_json::Value = if body.is_empty() { serde_json::Value::Null } else {
        serde_json::from_slice(body).map_err(|err| bad_request(channel, err))?
    };
    serde_json::from_value(value).map_err(|err| bad_request(channel, err))
}

async fn dispatch(State(surface): State<Arc<IpcSurface>>, Path(channel): Path<String>, body: Bytes) -> Response {
    if !is_whitelisted(&channel) {
        return UnknownChannel(channel).into_response();
    }

    macro_rules! try_parse {
        ($ty:ty) => {
            match parse::<$ty>(&channel, &body) {
                Ok(value) => value,
                Err(response) => return response,
            }
        };
    }

    match channel.as_str() {
        "account.list" => match surface.account_list().await {
            Ok(list) => ok(list),
            Err(error) => IpcError(error).into_response(),
        },
        "account.get" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.account_get(&req.id).await {
                Ok(record) => ok(record),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "account.create" => {
            let draft = try_parse!(corewatch_types::AccountDraft);
            match surface.account_create(draft).await {
                Ok(record) => ok(record),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "account.update" => {
            let req: AccountUpdateRequest = try_parse!(AccountUpdateRequest);
            match surface.account_update(&req.id, req.patch).await {
                Ok(record) => ok(record),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "account.delete" => {
            let req: AccountDeleteRequest = try_parse!(AccountDeleteRequest);
            match surface.account_delete(&req.id, req.retain_storage).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "account.reorder" => {
            let req: AccountReorderRequest = try_parse!(AccountReorderRequest);
            match surface.account_reorder(req.id_sequence).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.start" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.instance_start(&req.id).await {
                Ok(status) => ok(status),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.stop" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.instance_stop(&req.id).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.restart" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.instance_restart(&req.id).await {
                Ok(status) => ok(status),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.updateProxy" => {
            let req: InstanceProxyUpdateRequest = try_parse!(InstanceProxyUpdateRequest);
            match surface.instance_update_proxy(&req.id, req.proxy).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.status" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.instance_status(&req.id).await {
                Ok(status) => ok(status),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.health" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.instance_health(&req.id).await {
                Ok(status) => ok(status),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "instance.healthAll" => ok(surface.instance_health_all().await),
        "view.switchTo" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.view_switch_to(&req.id).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "view.switchToIndex" => {
            let req: ViewSwitchToIndexRequest = try_parse!(ViewSwitchToIndexRequest);
            match surface.view_switch_to_index(req.index).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "view.next" => match surface.view_next().await {
            Ok(()) => ok_empty(),
            Err(error) => IpcError(error).into_response(),
        },
        "view.previous" => match surface.view_previous().await {
            Ok(()) => ok_empty(),
            Err(error) => IpcError(error).into_response(),
        },
        "view.active" => ok(crate::types::ViewActiveResponse { account_id: surface.view_active().await }),
        "view.reload" => {
            let req: ViewReloadRequest = try_parse!(ViewReloadRequest);
            match surface.view_reload(&req.id, req.ignore_cache).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "view.loadUrl" => {
            let req: ViewLoadUrlRequest = try_parse!(ViewLoadUrlRequest);
            match surface.view_load_url(&req.id, req.url).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "session.hasData" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            ok(crate::types::SessionHasDataResponse { has_data: surface.session_has_data(&req.id).await })
        }
        "session.clear" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.session_clear(&req.id).await {
                Ok(()) => ok_empty(),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "session.stats" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            match surface.session_stats(&req.id).await {
                Ok(stats) => ok(stats),
                Err(error) => IpcError(error).into_response(),
            }
        }
        "session.detectLogin" => {
            let req: AccountIdRequest = try_parse!(AccountIdRequest);
            ok(surface.session_detect_login(&req.id).await)
        }
        "migration.status" => ok(surface.migration_status().await),
        "migration.execute" => match surface.migration_execute().await {
            Ok(outcome) => ok(outcome_to_json(outcome)),
            Err(error) => IpcError(error).into_response(),
        },
        _ => UnknownChannel(channel).into_response(),
    }
}

/// `MigrationOutcome` lives in `corewatch-migration` without a `Serialize`
/// derive (it's an internal-facing type there); the IPC layer's concern is
/// reporting it over the wire, so the field copy happens here rather than
/// growing that crate's public type with a serde dependency it otherwise
/// doesn't need.
fn outcome_to_json(outcome: corewatch_migration::MigrationOutcome) -> serde_json::Value {
    serde_json::json!({
        "ran": outcome.ran,
        "migratedCount": outcome.migrated_count,
        "warnings": outcome.warnings,
    })
}

async fn notifications(State(surface): State<Arc<IpcSurface>>) -> Response {
    let stream = BroadcastStream::new(surface.subscribe_notifications()).filter_map(|item| async move {
        let notification: Notification = item.ok()?;
        let mut line = serde_json::to_vec(&notification).ok()?;
        line.push(b'\n');
        Some(Ok::<_, std::convert::Infallible>(Bytes::from(line)))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
