//! Configuration Store: durable, validated storage of the
//! account registry and global settings. Every mutation is serialized
//! through a single write guard and persisted with write-temp-then-rename
//! atomicity.

pub mod defaults;
pub mod store;

pub use store::{ConfigStore, JsonFileConfigStore};

#[cfg(test)]
mod tests;
