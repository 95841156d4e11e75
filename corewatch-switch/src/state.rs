//! Per-view bookkeeping the engine keeps alongside the supervised runtime:
//! state per account view is one of `{created, loading, ready, error,
//! crashed}`.

use corewatch_types::ViewState;

#[derive(Debug, Clone)]
pub(crate) struct ViewEntry {
    pub(crate) state: ViewState,
}

impl ViewEntry {
    pub(crate) fn created() -> Self {
        Self { state: ViewState::Created }
    }
}
