//! Fatigue telemetry
//!
//! Turns per-frame fatigue results into schema-versioned window logs and
//! session summaries, and keeps independent data-quality counters.

mod config;
mod quality;
mod session;
mod window;

pub use config::TelemetryConfig;
pub use quality::DataQualityTracker;
pub use session::SessionTracker;
pub use storage::DataQualitySnapshot;
pub use window::{hash_device_id, WindowLogger};
