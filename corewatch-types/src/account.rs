use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// A durable account record: identity, ordering, and the per-account
/// settings that govern its isolated runtime.
///
/// No window geometry is stored here — geometry is a property of the
/// shell, not of an individual account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    pub note: String,
    /// Non-negative, unique within the registry. Display ordering.
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub auto_start: bool,
    /// Storage partition label, e.g. `account_<id>`.
    pub session_dir: String,
    pub proxy: ProxySettings,
    pub translation: TranslationSettings,
    pub notifications: NotificationSettings,
}

impl AccountRecord {
    /// Apply a patch in place. Fields absent from the patch are untouched;
    /// `last_active_at` is always bumped to now, per the round-trip law
    /// `update(id, {})` is a no-op up to `last_active_at`.
    pub fn apply_patch(&mut self, patch: AccountPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(note) = patch.note {
            self.note = note;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(auto_start) = patch.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(session_dir) = patch.session_dir {
            self.session_dir = session_dir;
        }
        if let Some(proxy) = patch.proxy {
            self.proxy = proxy;
        }
        if let Some(translation) = patch.translation {
            self.translation = translation;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        self.last_active_at = now;
    }
}

/// A partial update to an [`AccountRecord`]. Every field is optional and
/// explicit presence (not a sentinel value) signals "change this field."
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub note: Option<String>,
    pub order: Option<u32>,
    pub auto_start: Option<bool>,
    pub session_dir: Option<String>,
    pub proxy: Option<ProxySettings>,
    pub translation: Option<TranslationSettings>,
    pub notifications: Option<NotificationSettings>,
}

/// The subset of an [`AccountRecord`] a caller supplies on `create`; the
/// store assigns `id` and `order`, and defaults anything else omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDraft {
    pub name: String,
    pub note: Option<String>,
    pub auto_start: Option<bool>,
    pub session_dir: Option<String>,
    pub proxy: Option<ProxySettings>,
    pub translation: Option<TranslationSettings>,
    pub notifications: Option<NotificationSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Socks5,
    Http,
    Https,
}

impl ProxyProtocol {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "socks5" => Some(Self::Socks5),
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub enabled: bool,
    /// Present only when `enabled`; validated only in that case.
    pub protocol: Option<ProxyProtocol>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bypass: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationEngine {
    Google,
    Gpt4,
    Gemini,
    Deepseek,
}

impl TranslationEngine {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "gpt4" => Some(Self::Gpt4),
            "gemini" => Some(Self::Gemini),
            "deepseek" => Some(Self::Deepseek),
            _ => None,
        }
    }

    /// `engine != google` requires a non-empty API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Google)
    }
}

/// Per-contact override of the account-level translation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FriendTranslationOverride {
    pub target_language: Option<String>,
    pub auto_translate: Option<bool>,
    pub translate_input: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationSettings {
    pub enabled: bool,
    pub target_language: Option<String>,
    pub engine: Option<TranslationEngine>,
    pub api_key: Option<String>,
    pub auto_translate: bool,
    pub translate_input: bool,
    pub friend_settings: HashMap<String, FriendTranslationOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub sound: bool,
    pub badge: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true, sound: true, badge: true }
    }
}
