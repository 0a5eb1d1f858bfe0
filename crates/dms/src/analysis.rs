//! Per-frame analysis result

use feature_engine::{FatigueFeatures, HeadPose};
use serde::{Deserialize, Serialize};

use crate::state::FatigueLevel;

/// Output of one `DmsModule::analyze` call, handed to alerting and telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueResult {
    /// A face is present (or within the face-loss grace window)
    pub face_detected: bool,
    pub is_calibrating: bool,
    /// Calibration progress in percent
    pub calibration_progress: f64,

    pub left_ear: f64,
    pub right_ear: f64,
    pub avg_ear: f64,
    #[serde(rename = "baselineEAR", skip_serializing_if = "Option::is_none")]
    pub baseline_ear: Option<f64>,
    /// Smoothed EAR relative to the baseline
    #[serde(rename = "normalizedEAR", skip_serializing_if = "Option::is_none")]
    pub normalized_ear: Option<f64>,
    pub head_pose: HeadPose,

    pub blink_detected: bool,
    /// Blinks per minute
    pub blink_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_entropy: Option<f64>,
    pub perclos: f64,

    pub fatigue_score: f64,
    pub fatigue_level: FatigueLevel,
    /// Measurement reliability
    pub confidence: f64,

    pub sustained_low_ear: bool,
    pub unstable_signal: bool,
    /// Face briefly lost; previous level carried forward
    pub held: bool,

    pub timestamp_ms: u64,
}

impl FatigueResult {
    /// No face and no grace left
    pub fn no_face(timestamp_ms: u64) -> Self {
        Self {
            face_detected: false,
            is_calibrating: true,
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Face briefly missing: keep the level, report zero confidence
    pub fn hold(
        timestamp_ms: u64,
        fatigue_level: FatigueLevel,
        is_calibrating: bool,
        calibration_progress: f64,
    ) -> Self {
        Self {
            face_detected: true,
            is_calibrating,
            calibration_progress,
            fatigue_level,
            confidence: 0.0,
            held: true,
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Face present but the baseline has not locked yet
    pub fn calibrating(features: &FatigueFeatures, progress_pct: f64, timestamp_ms: u64) -> Self {
        Self {
            face_detected: true,
            is_calibrating: true,
            calibration_progress: progress_pct,
            left_ear: features.left_ear,
            right_ear: features.right_ear,
            avg_ear: features.avg_ear,
            head_pose: features.head_pose,
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Blink pattern looks anomalously regular
    pub fn low_liveness(&self, entropy_threshold: f64) -> bool {
        matches!(self.blink_entropy, Some(e) if e < entropy_threshold)
    }

    /// Result carries a real fatigue decision
    pub fn is_decisive(&self) -> bool {
        self.face_detected && !self.is_calibrating && !self.held
    }
}
