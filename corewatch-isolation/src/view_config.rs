//! The fixed view-surface isolation contract: scripting enabled,
//! node-level API disabled, context isolation enabled, sandbox on, with a
//! preload hook and a realistic user-agent string.

use corewatch_types::AccountId;

/// A realistic desktop browser user agent, so the external chat service
/// treats the view as a normal browser rather than an automation client.
/// Implementers embedding a real webview should keep this in sync with
/// whatever Chromium/WebKit build their runtime ships.
pub fn default_user_agent() -> &'static str {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
}

/// The per-account embedded-view configuration the Instance Supervisor
/// hands to whatever toolkit renders the isolated browser-like surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSurfaceConfig {
    pub account_id: AccountId,
    pub session_label: String,
    pub scripting_enabled: bool,
    pub node_integration_disabled: bool,
    pub context_isolation_enabled: bool,
    pub sandbox_enabled: bool,
    /// Path or identifier of the preload hook the external translation
    /// collaborator uses to inject its content script after `load-finished`.
    pub preload_hook: Option<String>,
    pub user_agent: String,
}

impl ViewSurfaceConfig {
    /// Build the fixed isolation contract for `account_id`: every field
    /// here is non-negotiable except `preload_hook`, which the caller
    /// supplies (it's the out-of-scope content-script collaborator's
    /// entry point).
    pub fn for_account(account_id: AccountId, preload_hook: Option<String>) -> Self {
        let session_label = corewatch_types::paths::session_label(&account_id);
        Self {
            account_id,
            session_label,
            scripting_enabled: true,
            node_integration_disabled: true,
            context_isolation_enabled: true,
            sandbox_enabled: true,
            preload_hook,
            user_agent: default_user_agent().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_isolation_contract_is_fixed_regardless_of_preload_hook() {
        let id = AccountId::generate();
        let config = ViewSurfaceConfig::for_account(id.clone(), None);
        assert!(config.scripting_enabled);
        assert!(config.node_integration_disabled);
        assert!(config.context_isolation_enabled);
        assert!(config.sandbox_enabled);
        assert_eq!(config.session_label, format!("persist:account_{id}"));
    }
}
