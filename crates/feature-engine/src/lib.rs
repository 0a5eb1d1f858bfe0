//! Feature Engineering Engine
//!
//! Turns normalized facial landmarks into the per-frame geometric features
//! consumed by the fatigue pipeline, plus the windowed statistics used for
//! telemetry (normalized EAR mean/variance, blink entropy).

mod features;
mod landmarks;
mod statistics;

pub use features::{FatigueFeatures, FeatureConfig, FeatureExtractor, HeadPose};
pub use landmarks::{LandmarkFrame, LandmarkPoint, MeshIndex};
pub use statistics::{blink_entropy, StatisticalFeatures};

use thiserror::Error;

/// Feature extraction errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureError {
    /// The detector returned fewer points than the mesh layout requires
    #[error("Landmark {index} missing (frame has {available} points)")]
    MissingLandmark { index: usize, available: usize },

    /// The detector returned a NaN or infinite coordinate
    #[error("Landmark {index} has a non-finite coordinate")]
    NonFiniteLandmark { index: usize },

    /// Image dimensions are unusable for pixel-space scaling
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}
