use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};

/// Stable opaque identifier for an account record.
///
/// Assigned once at `create` time and never reused, even after the account
/// is deleted.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct AccountId(String);

impl AccountId {
    pub fn generate() -> Self {
        Self(format!("acct-{}", uuid::Uuid::new_v4()))
    }
}

/// Identifier for a live view bound to an account's runtime.
///
/// Currently 1:1 with [`AccountId`] (one view per account), kept distinct
/// so call sites that mean "the view for this account" read that way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize)]
pub struct ViewId(String);

impl From<&AccountId> for ViewId {
    fn from(id: &AccountId) -> Self {
        Self(id.to_string())
    }
}
