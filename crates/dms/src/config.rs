//! DMS configuration

use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Blink detection and blink-rate window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Average EAR below this counts as an eyes-closed frame
    pub threshold: f64,
    /// Shortest closed run (frames) that counts as a blink
    pub min_frames: u32,
    /// Longest closed run (frames) that counts as a blink
    pub max_frames: u32,
    /// Blink-rate window (milliseconds)
    pub window_ms: u64,
    /// Histogram bucket for inter-blink entropy (milliseconds)
    pub entropy_bin_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            threshold: 0.20,
            min_frames: 2,
            max_frames: 15,
            window_ms: 60_000,
            entropy_bin_ms: 250,
        }
    }
}

/// Per-session baseline calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Sampling duration (milliseconds)
    pub duration_ms: u64,
    /// Samples required before the baseline can lock
    pub min_samples: usize,
    /// Samples outside (min, max) are treated as detection noise
    pub plausible_min_ear: f64,
    pub plausible_max_ear: f64,
    /// Lower bound applied to the locked baseline
    pub min_baseline_ear: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 4000,
            min_samples: 8,
            plausible_min_ear: 0.15,
            plausible_max_ear: 0.35,
            min_baseline_ear: 0.18,
        }
    }
}

/// Rolling eye-closure ratio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerclosConfig {
    /// Average EAR below this counts as closed
    pub closure_threshold: f64,
    /// Trailing window (milliseconds)
    pub window_ms: u64,
    /// Frames needed in the window before a ratio is reported
    pub min_frames: usize,
}

impl Default for PerclosConfig {
    fn default() -> Self {
        Self {
            closure_threshold: 0.20,
            window_ms: 20_000,
            min_frames: 15,
        }
    }
}

/// Measurement reliability scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Plausible open-eye EAR band
    pub ear_min: f64,
    pub ear_max: f64,
    pub ear_penalty: f64,
    /// Mouth opening beyond this (pixels) suggests occlusion or talking
    pub mouth_extreme_px: f64,
    pub mouth_penalty: f64,
    /// Penalty for any head pose other than center
    pub pose_penalty: f64,
    /// Output clamp
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            ear_min: 0.15,
            ear_max: 0.35,
            ear_penalty: 0.2,
            mouth_extreme_px: 80.0,
            mouth_penalty: 0.2,
            pose_penalty: 0.1,
            floor: 0.5,
            ceiling: 1.0,
        }
    }
}

/// Continuous fatigue score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub ear_weight: f64,
    pub blink_weight: f64,
    pub pose_weight: f64,
    /// EMA factor applied to normalized EAR
    pub ear_smoothing_alpha: f64,
    /// Clamp for avgEAR / baselineEAR
    pub normalized_ear_min: f64,
    pub normalized_ear_max: f64,
    /// Drop in normalized EAR that saturates the EAR component
    pub ear_full_scale: f64,
    /// Blink rate (per minute) where the blink component starts rising
    pub blink_rate_onset: f64,
    /// Additional blinks per minute until the component saturates
    pub blink_rate_span: f64,
    /// PERCLOS that saturates the blink component
    pub perclos_full_scale: f64,
    pub pose_up: f64,
    pub pose_down: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            ear_weight: 0.45,
            blink_weight: 0.35,
            pose_weight: 0.20,
            ear_smoothing_alpha: 0.3,
            normalized_ear_min: 0.3,
            normalized_ear_max: 1.3,
            ear_full_scale: 0.5,
            blink_rate_onset: 10.0,
            blink_rate_span: 20.0,
            perclos_full_scale: 0.35,
            pose_up: 0.5,
            pose_down: 1.0,
        }
    }
}

/// Hysteresis thresholds and debounce for the level state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub medium_enter: f64,
    pub medium_exit: f64,
    pub high_enter: f64,
    pub high_exit: f64,
    /// Minimum time a level is held before another transition (milliseconds)
    pub min_state_duration_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            medium_enter: 0.55,
            medium_exit: 0.45,
            high_enter: 0.75,
            high_exit: 0.65,
            min_state_duration_ms: 5000,
        }
    }
}

/// Signal-stability check on normalized EAR
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Trailing window (milliseconds)
    pub window_ms: u64,
    /// Samples needed before variance is trusted
    pub min_samples: usize,
    /// Variance above this marks the signal unstable
    pub unstable_variance: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window_ms: 20_000,
            min_samples: 8,
            unstable_variance: 0.015,
        }
    }
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    pub features: FeatureConfig,
    pub blink: BlinkConfig,
    pub calibration: CalibrationConfig,
    pub perclos: PerclosConfig,
    pub confidence: ConfidenceConfig,
    pub score: ScoreConfig,
    pub resolver: ResolverConfig,
    pub stability: StabilityConfig,
    /// Face absence tolerated before a continuity reset (milliseconds)
    pub face_lost_grace_ms: u64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            blink: BlinkConfig::default(),
            calibration: CalibrationConfig::default(),
            perclos: PerclosConfig::default(),
            confidence: ConfidenceConfig::default(),
            score: ScoreConfig::default(),
            resolver: ResolverConfig::default(),
            stability: StabilityConfig::default(),
            face_lost_grace_ms: 1000,
        }
    }
}

impl DmsConfig {
    /// Create strict config (faster level changes, shorter face-loss tolerance)
    pub fn strict() -> Self {
        Self {
            resolver: ResolverConfig {
                min_state_duration_ms: 2500,
                ..Default::default()
            },
            blink: BlinkConfig {
                threshold: 0.22,
                ..Default::default()
            },
            face_lost_grace_ms: 600,
            ..Default::default()
        }
    }

    /// Create lenient config (slower level changes, longer face-loss tolerance)
    pub fn lenient() -> Self {
        Self {
            resolver: ResolverConfig {
                min_state_duration_ms: 8000,
                ..Default::default()
            },
            blink: BlinkConfig {
                threshold: 0.18,
                ..Default::default()
            },
            face_lost_grace_ms: 1500,
            ..Default::default()
        }
    }

    /// Reject configurations that would make the pipeline misbehave silently
    pub fn validate(&self) -> Result<(), DmsError> {
        if self.blink.min_frames == 0 || self.blink.min_frames > self.blink.max_frames {
            return Err(DmsError::Config(format!(
                "blink frame bounds [{}, {}] are invalid",
                self.blink.min_frames, self.blink.max_frames
            )));
        }
        if self.blink.window_ms == 0 || self.perclos.window_ms == 0 {
            return Err(DmsError::Config("window lengths must be non-zero".into()));
        }
        if self.calibration.duration_ms == 0 || self.calibration.min_baseline_ear <= 0.0 {
            return Err(DmsError::Config(
                "calibration needs a positive duration and baseline floor".into(),
            ));
        }
        let r = &self.resolver;
        if r.medium_exit >= r.medium_enter || r.high_exit >= r.high_enter {
            return Err(DmsError::Config(
                "hysteresis exit thresholds must sit below their entry thresholds".into(),
            ));
        }
        if r.medium_enter >= r.high_enter {
            return Err(DmsError::Config("MEDIUM must be entered below HIGH".into()));
        }
        let s = &self.score;
        if s.ear_weight + s.blink_weight + s.pose_weight <= 0.0 {
            return Err(DmsError::Config("score weights must sum to a positive value".into()));
        }
        if !(0.0..=1.0).contains(&s.ear_smoothing_alpha) || s.ear_smoothing_alpha == 0.0 {
            return Err(DmsError::Config("EAR smoothing alpha must be in (0, 1]".into()));
        }
        if self.confidence.floor > self.confidence.ceiling {
            return Err(DmsError::Config("confidence floor exceeds ceiling".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::default().validate().is_ok());
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_hysteresis() {
        let mut config = DmsConfig::default();
        config.resolver.medium_exit = 0.6;
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_rejects_inverted_blink_bounds() {
        let mut config = DmsConfig::default();
        config.blink.min_frames = 20;
        assert!(config.validate().is_err());
    }
}
