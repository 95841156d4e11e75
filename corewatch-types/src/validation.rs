//! The binding validation contract. Shared by the config store
//! and the migration engine so both accept/reject records identically.

use crate::account::{AccountRecord, ProxySettings, TranslationSettings};

pub const NAME_MAX_LEN: usize = 100;

/// Validate a fully-populated record, collecting every violation rather
/// than stopping at the first.
pub fn validate_record(record: &AccountRecord) -> Vec<String> {
    let mut errors = Vec::new();
    validate_name(&record.name, &mut errors);
    validate_session_dir(&record.session_dir, &mut errors);
    validate_proxy(&record.proxy, &mut errors);
    validate_translation(&record.translation, &mut errors);
    errors
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    if name.is_empty() {
        errors.push("name must not be empty".to_string());
    } else if name.chars().count() > NAME_MAX_LEN {
        errors.push(format!("name must be at most {NAME_MAX_LEN} characters"));
    }
}

fn validate_session_dir(session_dir: &str, errors: &mut Vec<String>) {
    if session_dir.is_empty() {
        errors.push("sessionDir must not be empty".to_string());
    }
}

/// When `enabled = false`, other fields may hold stale values and are not
/// validated.
pub fn validate_proxy(proxy: &ProxySettings, errors: &mut Vec<String>) {
    if !proxy.enabled {
        return;
    }
    match &proxy.host {
        Some(host) if !host.is_empty() => {}
        _ => errors.push("proxy.host must not be empty when proxy is enabled".to_string()),
    }
    match proxy.port {
        Some(port) if port >= 1 => {}
        _ => errors.push("proxy.port must be in [1, 65535] when proxy is enabled".to_string()),
    }
    if proxy.protocol.is_none() {
        errors.push("proxy.protocol must be one of socks5, http, https when proxy is enabled".to_string());
    }
}

pub fn validate_translation(translation: &TranslationSettings, errors: &mut Vec<String>) {
    if !translation.enabled {
        return;
    }
    match &translation.target_language {
        Some(lang) if !lang.is_empty() => {}
        _ => errors.push("translation.targetLanguage must not be empty when translation is enabled".to_string()),
    }
    match translation.engine {
        Some(engine) => {
            if engine.requires_api_key() {
                match &translation.api_key {
                    Some(key) if !key.is_empty() => {}
                    _ => errors.push(format!(
                        "translation.apiKey must not be empty for engine {:?}",
                        engine
                    )),
                }
            }
        }
        None => errors.push("translation.engine must be one of google, gpt4, gemini, deepseek".to_string()),
    }
}

/// Parse-and-validate a raw port value against the accepted range's
/// boundary: 0 and 65536 are rejected, 1 and 65535 are accepted.
pub fn port_in_range(port: u32) -> Option<u16> {
    if (1..=65535).contains(&port) { Some(port as u16) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{ProxyProtocol, TranslationEngine};

    #[test]
    fn proxy_disabled_skips_validation() {
        let mut errors = Vec::new();
        let proxy = ProxySettings { enabled: false, ..Default::default() };
        validate_proxy(&proxy, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn proxy_enabled_requires_host_port_protocol() {
        let mut errors = Vec::new();
        let proxy = ProxySettings { enabled: true, ..Default::default() };
        validate_proxy(&proxy, &mut errors);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn proxy_port_boundaries() {
        assert_eq!(port_in_range(0), None);
        assert_eq!(port_in_range(1), Some(1));
        assert_eq!(port_in_range(65535), Some(65535));
        assert_eq!(port_in_range(65536), None);
    }

    #[test]
    fn translation_google_allows_empty_key() {
        let mut errors = Vec::new();
        let translation = TranslationSettings {
            enabled: true,
            target_language: Some("en".to_string()),
            engine: Some(TranslationEngine::Google),
            api_key: None,
            ..Default::default()
        };
        validate_translation(&translation, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn translation_non_google_requires_key() {
        let mut errors = Vec::new();
        let translation = TranslationSettings {
            enabled: true,
            target_language: Some("en".to_string()),
            engine: Some(TranslationEngine::Gpt4),
            api_key: None,
            ..Default::default()
        };
        validate_translation(&translation, &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn proxy_protocol_parses_enumerated_set() {
        assert_eq!(ProxyProtocol::parse("socks5"), Some(ProxyProtocol::Socks5));
        assert_eq!(ProxyProtocol::parse("bogus"), None);
    }
}
