//! Mapping from [`CoreError`] to the typed error payload every IPC
//! response carries on failure: a fixed category string and a
//! human-readable message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use corewatch_types::CoreError;

/// The wire shape of a failed IPC call.
#[derive(Debug, Clone, Serialize)]
pub struct IpcErrorPayload {
    pub category: &'static str,
    pub message: String,
}

/// Newtype so `IntoResponse` can be implemented here without orphan-rule
/// trouble on the shared [`CoreError`].
pub struct IpcError(pub CoreError);

impl From<CoreError> for IpcError {
    fn from(error: CoreError) -> Self {
        Self(error)
    }
}

impl IntoResponse for IpcError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let payload = IpcErrorPayload { category: self.0.category(), message: self.0.to_string() };
        (status, Json(payload)).into_response()
    }
}

/// Status code per category: the four client-caused categories map to
/// ordinary 4xx client
/// errors; everything else is a server-side condition the shell reports
/// via its error pane.
fn status_for(error: &CoreError) -> StatusCode {
    match error {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::DuplicateId { .. } => StatusCode::CONFLICT,
        CoreError::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Capacity { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::ProxyFailure { .. }
        | CoreError::InjectionFailure { .. }
        | CoreError::PageLoadFailure { .. }
        | CoreError::Unresponsive { .. } => StatusCode::BAD_GATEWAY,
        CoreError::InstanceCrash { .. }
        | CoreError::CrashThresholdExceeded { .. }
        | CoreError::RestartFailure { .. }
        | CoreError::StoreCorrupt { .. }
        | CoreError::MigrationFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Channel name didn't appear in [`crate::channel::CHANNELS`].
pub struct UnknownChannel(pub String);

impl IntoResponse for UnknownChannel {
    fn into_response(self) -> Response {
        let payload = IpcErrorPayload { category: "UnknownChannel", message: format!("unknown channel: {}", self.0) };
        (StatusCode::NOT_FOUND, Json(payload)).into_response()
    }
}
