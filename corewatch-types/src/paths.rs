//! Naming conventions shared by the Configuration Store (which deletes a
//! partition directory on `delete`) and the Session/Isolation Layer (which
//! creates and owns it) — kept here, in the leaf crate, so neither depends
//! on the other for a string format.

use crate::ids::AccountId;

/// Directory name for an account's exclusive storage partition, relative
/// to the app's `profiles/` root: `profiles/account_{a}`.
pub fn partition_dir_name(id: &AccountId) -> String {
    format!("account_{id}")
}

/// The storage session label an account's runtime is bound to, so its
/// partition survives restarts: `persist:account_{a}`.
pub fn session_label(id: &AccountId) -> String {
    format!("persist:account_{id}")
}
