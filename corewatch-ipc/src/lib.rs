//! Shell/IPC Surface: a typed, whitelisted request/response and
//! notification contract standing in for the actual Electron/webview IPC
//! channel. Built the way the dependency stack builds its own HTTP
//! surfaces — an async router keyed by channel name, typed JSON bodies —
//! because that's the closest in-repo analogue to "an IPC-style contract"
//! exercisable by tests without a real shell host.

pub mod channel;
pub mod error;
pub mod router;
pub mod surface;
pub mod types;

pub use channel::{is_whitelisted, CHANNELS};
pub use error::{IpcError, IpcErrorPayload, UnknownChannel};
pub use router::build_router;
pub use surface::IpcSurface;
