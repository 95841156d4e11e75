//! Shared identifiers, data model and error taxonomy for the corewatch
//! account-isolation engine. Every other crate in the workspace depends on
//! this one; it depends on nothing in-workspace.

pub mod account;
pub mod error;
pub mod ids;
pub mod instance;
pub mod paths;
pub mod registry;
pub mod validation;
pub mod view;

pub use account::{
    AccountDraft, AccountPatch, AccountRecord, FriendTranslationOverride, NotificationSettings, ProxyProtocol,
    ProxySettings, TranslationEngine, TranslationSettings,
};
pub use error::{CoreError, Result, Severity};
pub use ids::{AccountId, ViewId};
pub use instance::{InstanceState, InstanceStatus, LoginStatus};
pub use registry::{GlobalState, RegistryDocument, ResourceLimits, SIDEBAR_WIDTH_DEFAULT, SIDEBAR_WIDTH_MAX, SIDEBAR_WIDTH_MIN};
pub use view::ViewState;
