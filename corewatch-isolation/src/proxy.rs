//! Per-account proxy wiring: a dedicated proxy configuration applied to
//! that session only; authentication credentials, when present, are
//! injected by attaching a `Proxy-Authorization` header (credentials
//! base64-encoded) to outbound requests.

use base64::Engine;

use corewatch_types::{validation, CoreError, ProxyProtocol, ProxySettings, Result};

/// The proxy configuration actually in effect for an account's session,
/// after validation. `None` fields mean "disabled" rather than "stale" —
/// a disabled proxy's fields are left as-is rather than cleared, so this
/// type carries only the validated, enabled shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedProxy {
    pub enabled: bool,
    pub protocol: Option<ProxyProtocol>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub bypass: Option<String>,
    /// Pre-built `Proxy-Authorization` header value, ready to attach to
    /// outbound requests. `None` when no credentials were supplied.
    pub authorization_header: Option<String>,
}

impl AppliedProxy {
    pub fn disabled() -> Self {
        Self { enabled: false, protocol: None, host: None, port: None, bypass: None, authorization_header: None }
    }
}

/// Validate `settings` against the binding contract and, if
/// enabled, build the header the isolation layer attaches to that
/// account's outbound requests.
pub fn apply_proxy(settings: &ProxySettings) -> Result<AppliedProxy> {
    let mut errors = Vec::new();
    validation::validate_proxy(settings, &mut errors);
    if !errors.is_empty() {
        return Err(CoreError::ValidationError { errors });
    }

    if !settings.enabled {
        return Ok(AppliedProxy::disabled());
    }

    Ok(AppliedProxy {
        enabled: true,
        protocol: settings.protocol,
        host: settings.host.clone(),
        port: settings.port,
        bypass: settings.bypass.clone(),
        authorization_header: build_proxy_authorization_header(settings.username.as_deref(), settings.password.as_deref()),
    })
}

/// `Basic base64(username:password)`, the standard `Proxy-Authorization`
/// shape, or `None` when no username was supplied. A password may be
/// empty; a username may not.
pub fn build_proxy_authorization_header(username: Option<&str>, password: Option<&str>) -> Option<String> {
    let username = username.filter(|u| !u.is_empty())?;
    let password = password.unwrap_or("");
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    Some(format!("Basic {encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_proxy_is_not_validated_even_with_stale_fields() {
        let settings = ProxySettings { enabled: false, host: Some("".to_string()), port: Some(0), ..Default::default() };
        let applied = apply_proxy(&settings).unwrap();
        assert!(!applied.enabled);
    }

    #[test]
    fn enabled_proxy_requires_host_port_protocol() {
        let settings = ProxySettings { enabled: true, ..Default::default() };
        let err = apply_proxy(&settings).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
    }

    #[test]
    fn authorization_header_is_base64_basic_auth() {
        let header = build_proxy_authorization_header(Some("alice"), Some("hunter2")).unwrap();
        assert!(header.starts_with("Basic "));
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header.trim_start_matches("Basic "))
            .unwrap();
        assert_eq!(decoded, b"alice:hunter2");
    }

    #[test]
    fn no_username_means_no_authorization_header() {
        assert_eq!(build_proxy_authorization_header(None, Some("x")), None);
    }

    #[test]
    fn applied_proxy_for_different_accounts_never_mixes_credentials() {
        let p1 = ProxySettings {
            enabled: true,
            protocol: Some(ProxyProtocol::Socks5),
            host: Some("proxy1.example".to_string()),
            port: Some(1080),
            username: Some("acct1".to_string()),
            password: Some("pw1".to_string()),
            ..Default::default()
        };
        let p2 = ProxySettings {
            enabled: true,
            protocol: Some(ProxyProtocol::Http),
            host: Some("proxy2.example".to_string()),
            port: Some(8080),
            username: Some("acct2".to_string()),
            password: Some("pw2".to_string()),
            ..Default::default()
        };
        let applied1 = apply_proxy(&p1).unwrap();
        let applied2 = apply_proxy(&p2).unwrap();
        assert_ne!(applied1.authorization_header, applied2.authorization_header);
        assert_ne!(applied1.host, applied2.host);
    }
}
