//! Per-frame feature extraction

use crate::landmarks::{LandmarkFrame, MeshIndex};
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Coarse head pose bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeadPose {
    Up,
    Down,
    #[default]
    Center,
}

/// Geometric features for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueFeatures {
    /// Mean of both eyes
    pub avg_ear: f64,
    pub left_ear: f64,
    pub right_ear: f64,
    /// Lip separation in pixels
    pub mouth_open_dist: f64,
    pub head_pose: HeadPose,
}

/// Feature extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Chin below nose by more than this (pixels) reads as head down
    pub head_down_threshold_px: f64,
    /// Nose below chin by more than this (pixels) reads as head up
    pub head_up_threshold_px: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            head_down_threshold_px: 35.0,
            head_up_threshold_px: 35.0,
        }
    }
}

/// Landmark to feature converter
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extract features from one landmark frame
    pub fn extract(&self, frame: &LandmarkFrame) -> Result<FatigueFeatures, FeatureError> {
        if frame.image_width == 0 || frame.image_height == 0 {
            return Err(FeatureError::InvalidDimensions {
                width: frame.image_width,
                height: frame.image_height,
            });
        }

        let left_ear = eye_aspect_ratio(
            frame,
            MeshIndex::LEFT_EYE_TOP,
            MeshIndex::LEFT_EYE_BOTTOM,
            MeshIndex::LEFT_EYE_OUTER,
            MeshIndex::LEFT_EYE_INNER,
        )?;
        let right_ear = eye_aspect_ratio(
            frame,
            MeshIndex::RIGHT_EYE_TOP,
            MeshIndex::RIGHT_EYE_BOTTOM,
            MeshIndex::RIGHT_EYE_INNER,
            MeshIndex::RIGHT_EYE_OUTER,
        )?;

        let mouth_open_dist = frame.pixel_distance(MeshIndex::UPPER_LIP, MeshIndex::LOWER_LIP)?;
        let head_pose = self.head_pose(frame)?;

        let features = FatigueFeatures {
            avg_ear: (left_ear + right_ear) / 2.0,
            left_ear,
            right_ear,
            mouth_open_dist,
            head_pose,
        };
        trace!(?features, "Extracted frame features");
        Ok(features)
    }

    fn head_pose(&self, frame: &LandmarkFrame) -> Result<HeadPose, FeatureError> {
        let nose_y = frame.pixel_y(MeshIndex::NOSE_TIP)?;
        let chin_y = frame.pixel_y(MeshIndex::CHIN)?;

        Ok(if chin_y - nose_y > self.config.head_down_threshold_px {
            HeadPose::Down
        } else if nose_y - chin_y > self.config.head_up_threshold_px {
            HeadPose::Up
        } else {
            HeadPose::Center
        })
    }
}

/// Vertical lid distance over horizontal corner distance; 0 for a degenerate eye
fn eye_aspect_ratio(
    frame: &LandmarkFrame,
    top: usize,
    bottom: usize,
    corner_a: usize,
    corner_b: usize,
) -> Result<f64, FeatureError> {
    let vertical = frame.pixel_distance(top, bottom)?;
    let horizontal = frame.pixel_distance(corner_a, corner_b)?;
    if horizontal == 0.0 {
        return Ok(0.0);
    }
    Ok(vertical / horizontal)
}
