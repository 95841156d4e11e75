use serde::{Deserialize, Serialize};

/// Lifecycle state of a single account's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Created,
    Loading,
    Ready,
    Error,
    Crashed,
}
