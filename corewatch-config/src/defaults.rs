//! Validated defaults for fields a caller omits on `create`, and for the
//! Migration Engine's Transform step, which defaults missing fields to
//! the same validated defaults. Centralized here so both paths agree.

use corewatch_types::{
    AccountDraft, AccountId, AccountRecord, NotificationSettings, ProxySettings, TranslationSettings,
};

/// Build a fully-populated record from a caller-supplied draft. `id` and
/// `order` are assigned by the store, never the caller.
pub fn record_from_draft(id: AccountId, order: u32, draft: AccountDraft, now: chrono::DateTime<chrono::Utc>) -> AccountRecord {
    let session_dir = draft.session_dir.unwrap_or_else(|| corewatch_types::paths::partition_dir_name(&id));
    AccountRecord {
        id,
        name: draft.name,
        note: draft.note.unwrap_or_default(),
        order,
        created_at: now,
        last_active_at: now,
        auto_start: draft.auto_start.unwrap_or(false),
        session_dir,
        proxy: draft.proxy.unwrap_or_else(default_proxy),
        translation: draft.translation.unwrap_or_else(default_translation),
        notifications: draft.notifications.unwrap_or_default(),
    }
}

pub fn default_proxy() -> ProxySettings {
    ProxySettings::default()
}

pub fn default_translation() -> TranslationSettings {
    TranslationSettings::default()
}

pub fn default_notifications() -> NotificationSettings {
    NotificationSettings::default()
}
