//! Fatigue scan scheduling
//!
//! Drives one monitoring session: captures frames on an adaptive cadence,
//! keeps at most one capture in flight, and runs every result through
//! analysis, alerting and telemetry.

mod cadence;
mod guard;
mod pipeline;
mod scheduler;
mod source;

pub use cadence::ScanConfig;
pub use guard::{ScanGuard, ScanPermit};
pub use pipeline::{FatiguePipeline, FatiguePipelineBuilder, FrameReport};
pub use scheduler::{LifecycleSignal, ScanHandle, ScanReport, ScanScheduler};
pub use source::{FrameSource, Segment, SlotFrameSource, SyntheticFrameSource};

use thiserror::Error;

/// Frame capture errors (each one is a dropped frame)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("No frame available")]
    NoFrame,

    #[error("Capture failed: {0}")]
    Device(String),

    #[error("Capture timeout")]
    Timeout,
}

/// Pipeline wiring errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Required capability unavailable: {0}")]
    MissingCapability(&'static str),

    #[error("Analysis setup failed: {0}")]
    Dms(#[from] dms::DmsError),
}
