//! The content-script injection contract: after a `load-finished` event,
//! invoke the injector with a handle to the view. The injector itself —
//! the translation content script — is an out-of-scope collaborator; this
//! crate only defines the seam it plugs into.

use async_trait::async_trait;

use corewatch_types::{AccountId, CoreError, Result};

/// Implemented by the out-of-scope translation collaborator. The
/// Instance Supervisor calls `inject` once per account, after that
/// account's view reports its initial page load complete.
#[async_trait]
pub trait ContentScriptInjector: Send + Sync {
    async fn inject(&self, account_id: &AccountId) -> Result<()>;
}

/// Default injector for configurations that don't wire in a real
/// translation collaborator (e.g. tests, or an account with translation
/// disabled). Always succeeds and does nothing.
pub struct NoopInjector;

#[async_trait]
impl ContentScriptInjector for NoopInjector {
    async fn inject(&self, _account_id: &AccountId) -> Result<()> {
        Ok(())
    }
}

/// An injector that always fails, standing in for a broken or
/// misconfigured translation collaborator in tests that exercise the
/// Supervisor's `InjectionFailure` handling.
pub struct FailingInjector {
    pub message: String,
}

#[async_trait]
impl ContentScriptInjector for FailingInjector {
    async fn inject(&self, account_id: &AccountId) -> Result<()> {
        Err(CoreError::InjectionFailure { account_id: account_id.clone(), message: self.message.clone() })
    }
}
