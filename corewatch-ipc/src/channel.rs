//! The whitelisted channel set. The router consults
//! this list before dispatching a request to a handler — an unrecognized
//! channel name never reaches [`crate::surface::IpcSurface`].

/// Every request-response channel name the shell may call. Kept as one
/// flat list (rather than per-namespace enums) so the router's whitelist check
/// and the test suite's exhaustiveness check both walk the same slice.
pub const CHANNELS: &[&str] = &[
    "account.list",
    "account.get",
    "account.create",
    "account.update",
    "account.delete",
    "account.reorder",
    "instance.start",
    "instance.stop",
    "instance.restart",
    "instance.updateProxy",
    "instance.status",
    "instance.health",
    "instance.healthAll",
    "view.switchTo",
    "view.switchToIndex",
    "view.next",
    "view.previous",
    "view.active",
    "view.reload",
    "view.loadUrl",
    "session.hasData",
    "session.clear",
    "session.stats",
    "session.detectLogin",
    "migration.status",
    "migration.execute",
];

/// `true` iff `channel` is one of [`CHANNELS`].
pub fn is_whitelisted(channel: &str) -> bool {
    CHANNELS.contains(&channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_channels_are_whitelisted() {
        assert!(is_whitelisted("account.list"));
        assert!(is_whitelisted("view.loadUrl"));
    }

    #[test]
    fn unknown_channels_are_rejected() {
        assert!(!is_whitelisted("account.explode"));
        assert!(!is_whitelisted(""));
    }
}
