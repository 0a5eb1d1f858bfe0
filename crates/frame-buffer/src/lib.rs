//! Frame Buffers
//!
//! Two buffering primitives for the fatigue pipeline:
//! - [`LatestSlot`]: single-slot handoff between a capture callback and the
//!   scan loop (overwrite on write, read-and-clear on take)
//! - [`TimeWindow`]: FIFO of timestamped samples purged oldest-first once they
//!   fall outside a trailing duration

mod slot;
mod window;

pub use slot::LatestSlot;
pub use window::{TimeWindow, Timestamped};
