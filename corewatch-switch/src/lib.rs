//! View Switching Engine: multiplexes many warm account views
//! onto a single visible viewport, with bounded-latency, serialized,
//! last-target-wins `switchTo` transactions.

mod bounds;
mod engine;
mod state;

pub use bounds::ViewBounds;
pub use engine::{SwitchEngine, DEFAULT_RESIZE_DEBOUNCE};
