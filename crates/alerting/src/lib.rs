//! Alerting System
//!
//! Decides when a fatigue level deserves a user-facing alert: hard gates,
//! sustained-evaluation counting, cooldown, and per-level feedback patterns.

mod gate;
mod sink;

pub use gate::{decide, AlertConfig, AlertDecision, AlertGate, AlertState, SuppressReason};
pub use sink::{AlertPattern, AlertSink, LogAlertSink, MemoryAlertSink};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Alert output unavailable: {0}")]
    Unavailable(String),

    #[error("Alert playback failed: {0}")]
    Playback(String),
}
