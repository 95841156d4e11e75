//! Session/Isolation Layer: per-account
//! storage partitions, proxy wiring (including `Proxy-Authorization`
//! header construction), the view-surface isolation contract, and the
//! content-script injection + login-detection contracts the external
//! translation collaborator and the Instance Supervisor hang off of.

pub mod injection;
pub mod login;
pub mod partition;
pub mod proxy;
pub mod view_config;

pub use injection::{ContentScriptInjector, FailingInjector, NoopInjector};
pub use login::{infer_login_status, LoginSignal};
pub use partition::{partition_stats, PartitionStats};
pub use proxy::{apply_proxy, build_proxy_authorization_header, AppliedProxy};
pub use view_config::{default_user_agent, ViewSurfaceConfig};
