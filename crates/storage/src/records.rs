//! Telemetry record shapes

use dms::FatigueLevel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StorageError;

pub const WINDOW_LOG_SCHEMA: &str = "2.0";
pub const SESSION_SUMMARY_SCHEMA: &str = "2.0";

/// One logged evaluation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowLog {
    pub schema_version: String,
    pub session_id: Uuid,
    /// SHA-256 of the device identifier, lowercase hex
    #[serde(rename = "deviceHash")]
    pub device_id_hash: String,
    pub platform: String,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    pub window_duration_ms: u64,
    #[serde(rename = "baselineEAR")]
    pub baseline_ear: Option<f64>,
    #[serde(rename = "normalizedEARMean")]
    pub normalized_ear_mean: f64,
    #[serde(rename = "normalizedEARVariance")]
    pub normalized_ear_variance: f64,
    pub blink_rate: f64,
    pub blink_entropy: Option<f64>,
    pub perclos: f64,
    #[serde(rename = "sustainedLowEAR")]
    pub sustained_low_ear: bool,
    pub fatigue_level: FatigueLevel,
    pub confidence: f64,
    /// Confidence sits below the flag threshold
    pub low_confidence: bool,
    pub unstable_signal: bool,
    pub low_liveness: bool,
    pub scan_interval_ms: u64,
    pub face_detected_ratio: f64,
}

impl WindowLog {
    /// Reject records that downstream consumers must not trust
    pub fn validate(&self) -> Result<(), StorageError> {
        check_schema("window log", &self.schema_version, WINDOW_LOG_SCHEMA)?;

        if self.device_id_hash.len() != 64
            || !self.device_id_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(StorageError::Validation(
                "deviceHash must be a 64-character hex digest".into(),
            ));
        }
        if self.platform.is_empty() {
            return Err(StorageError::Validation("platform is empty".into()));
        }

        check_unit("confidence", self.confidence)?;
        check_unit("perclos", self.perclos)?;
        check_unit("faceDetectedRatio", self.face_detected_ratio)?;
        check_non_negative("blinkRate", self.blink_rate)?;
        check_non_negative("normalizedEARMean", self.normalized_ear_mean)?;
        check_non_negative("normalizedEARVariance", self.normalized_ear_variance)?;
        if let Some(baseline) = self.baseline_ear {
            check_non_negative("baselineEAR", baseline)?;
        }
        if let Some(entropy) = self.blink_entropy {
            check_non_negative("blinkEntropy", entropy)?;
        }
        Ok(())
    }
}

/// Share of frames spent at each level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LevelDistribution {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl LevelDistribution {
    pub fn total(&self) -> f64 {
        self.low + self.medium + self.high
    }

    pub fn get(&self, level: FatigueLevel) -> f64 {
        match level {
            FatigueLevel::Low => self.low,
            FatigueLevel::Medium => self.medium,
            FatigueLevel::High => self.high,
        }
    }
}

/// Frame-quality counters; every frame lands in exactly one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualitySnapshot {
    pub total_frames: u64,
    pub face_detected_frames: u64,
    /// Frames with no usable measurement (no face, or held through a dropout)
    pub dropped_frames: u64,
    pub calibration_frames: u64,
    pub low_confidence_frames: u64,
    pub valid_fatigue_frames: u64,
    pub high_fatigue_frames: u64,
    /// Mean confidence over valid frames
    pub avg_confidence: f64,
}

impl DataQualitySnapshot {
    /// Frames past calibration with a face in view
    pub fn scored_frames(&self) -> u64 {
        self.low_confidence_frames + self.valid_fatigue_frames
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.face_detected_frames + self.dropped_frames != self.total_frames {
            return Err(StorageError::Validation(
                "frameQuality: face-detected and dropped frames must add up to totalFrames".into(),
            ));
        }
        if self.calibration_frames + self.scored_frames() != self.face_detected_frames {
            return Err(StorageError::Validation(
                "frameQuality: calibration and scored frames must sum to faceDetectedFrames".into(),
            ));
        }
        if self.high_fatigue_frames > self.valid_fatigue_frames {
            return Err(StorageError::Validation(
                "frameQuality: more high-fatigue frames than valid frames".into(),
            ));
        }
        check_unit("frameQuality.avgConfidence", self.avg_confidence)
    }
}

/// Aggregate over one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub schema_version: String,
    pub session_id: Uuid,
    #[serde(rename = "startTime")]
    pub start_ms: u64,
    #[serde(rename = "endTime")]
    pub end_ms: u64,
    pub duration_ms: u64,
    pub avg_confidence: f64,
    pub peak_fatigue_level: FatigueLevel,
    #[serde(rename = "fatigueDistribution")]
    pub distribution: LevelDistribution,
    pub baseline_successful: bool,
    pub alert_count: u32,
    /// Frames that contributed to the distribution
    pub frame_count: u64,
    pub frame_quality: DataQualitySnapshot,
}

impl SessionSummary {
    pub fn validate(&self) -> Result<(), StorageError> {
        check_schema("session summary", &self.schema_version, SESSION_SUMMARY_SCHEMA)?;

        if self.end_ms < self.start_ms {
            return Err(StorageError::Validation("session ends before it starts".into()));
        }
        if self.duration_ms != self.end_ms - self.start_ms {
            return Err(StorageError::Validation(
                "durationMs does not match start/end".into(),
            ));
        }
        check_unit("avgConfidence", self.avg_confidence)?;

        let d = &self.distribution;
        for (name, share) in [("LOW", d.low), ("MEDIUM", d.medium), ("HIGH", d.high)] {
            check_unit(name, share)?;
        }
        let expected = if self.frame_count == 0 { 0.0 } else { 1.0 };
        if (d.total() - expected).abs() > 1e-6 {
            return Err(StorageError::Validation(format!(
                "distribution sums to {} (expected {expected})",
                d.total()
            )));
        }

        self.frame_quality.validate()?;
        if self.frame_quality.scored_frames() != self.frame_count {
            return Err(StorageError::Validation(format!(
                "frameCount {} does not match {} scored frames in frameQuality",
                self.frame_count,
                self.frame_quality.scored_frames()
            )));
        }
        Ok(())
    }
}

fn check_schema(kind: &str, actual: &str, expected: &str) -> Result<(), StorageError> {
    if actual != expected {
        return Err(StorageError::Validation(format!(
            "{kind} schema {actual:?} is not supported (expected {expected:?})"
        )));
    }
    Ok(())
}

fn check_unit(field: &str, value: f64) -> Result<(), StorageError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(StorageError::Validation(format!(
            "{field} = {value} is outside [0, 1]"
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<(), StorageError> {
    if !value.is_finite() || value < 0.0 {
        return Err(StorageError::Validation(format!(
            "{field} = {value} must be finite and non-negative"
        )));
    }
    Ok(())
}
