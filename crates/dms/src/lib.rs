//! Drowsiness Monitoring System (DMS)
//!
//! Real-time fatigue estimation from facial landmarks:
//! - Per-session baseline EAR calibration
//! - Blink detection, blink rate and blink entropy
//! - PERCLOS (eyelid closure ratio)
//! - Fatigue score with hysteresis level resolution
//! - Measurement confidence scoring

pub mod analysis;
pub mod blink;
pub mod calibration;
pub mod confidence;
pub mod config;
pub mod perclos;
pub mod score;
pub mod state;

pub use analysis::FatigueResult;
pub use blink::{BlinkDetector, BlinkEvent, BlinkWindow, MAX_BLINK_RATE, MIN_BLINK_RATE};
pub use calibration::{BaselineCalibrator, CalibrationState, CalibrationStatus};
pub use confidence::{ConfidenceScorer, ConfidenceSmoother, Ema};
pub use config::{
    BlinkConfig, CalibrationConfig, ConfidenceConfig, DmsConfig, PerclosConfig, ResolverConfig,
    ScoreConfig, StabilityConfig,
};
pub use perclos::PerclosTracker;
pub use score::{FatigueScore, FatigueScorer};
pub use state::{resolve_level, FatigueLevel, FatigueResolver, SubjectState};

use feature_engine::{FeatureError, FeatureExtractor, LandmarkFrame, StatisticalFeatures};
use thiserror::Error;
use tracing::{debug, info};

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Session context: owns every temporal stage for one subject
pub struct DmsModule {
    config: DmsConfig,
    extractor: FeatureExtractor,
    calibrator: BaselineCalibrator,
    blink_detector: BlinkDetector,
    blink_window: BlinkWindow,
    perclos: PerclosTracker,
    confidence: ConfidenceScorer,
    scorer: FatigueScorer,
    resolver: FatigueResolver,
    state: SubjectState,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            calibrator: BaselineCalibrator::new(config.calibration.clone()),
            blink_detector: BlinkDetector::new(&config.blink),
            blink_window: BlinkWindow::new(config.blink.window_ms),
            perclos: PerclosTracker::new(&config.perclos),
            confidence: ConfidenceScorer::new(config.confidence.clone()),
            scorer: FatigueScorer::new(config.score.clone()),
            resolver: FatigueResolver::new(config.resolver.clone()),
            state: SubjectState::new(&config),
            config,
        })
    }

    /// Analyze one frame (`None` when no face was found).
    ///
    /// An `Err` is a dropped frame: no temporal state is touched.
    pub fn analyze(
        &mut self,
        frame: Option<&LandmarkFrame>,
        now_ms: u64,
    ) -> Result<FatigueResult, DmsError> {
        let Some(frame) = frame else {
            return Ok(self.face_absent(now_ms));
        };

        let features = self.extractor.extract(frame)?;
        self.state.last_face_seen_ms = Some(now_ms);

        let baseline_ear = match self.calibrator.update(features.avg_ear, now_ms) {
            CalibrationStatus::Calibrating { progress_pct } => {
                let mut result = FatigueResult::calibrating(&features, progress_pct, now_ms);
                result.confidence = self.confidence.score_features(&features);
                return Ok(result);
            }
            CalibrationStatus::Ready { baseline_ear } => baseline_ear,
        };
        self.state.frames_since_baseline += 1;

        let normalized = self.scorer.normalize_ear(features.avg_ear, baseline_ear);
        let smoothed = self.state.ear_ema.update(normalized);
        self.state.normalized_ear_history.push(now_ms, normalized);

        let blink_detected = self.blink_detector.update(features.avg_ear);
        if blink_detected {
            self.blink_window.add_blink(now_ms);
        }
        let blink_rate = self.blink_window.blink_rate(now_ms);
        let blink_entropy = self.blink_window.entropy(self.config.blink.entropy_bin_ms);
        let perclos = self.perclos.update(features.avg_ear, now_ms);

        let score = self
            .scorer
            .score(smoothed, blink_rate, perclos, features.head_pose);
        let fatigue_level = self.resolver.update(score.total, now_ms);
        let confidence = self.confidence.score_features(&features);

        let unstable_signal = self.is_unstable();
        let sustained_low_ear = self.blink_detector.is_sustained_closure();

        debug!(
            score = score.total,
            level = %fatigue_level,
            blink_rate,
            perclos,
            confidence,
            "Frame analysed"
        );

        Ok(FatigueResult {
            face_detected: true,
            is_calibrating: false,
            calibration_progress: 100.0,
            left_ear: features.left_ear,
            right_ear: features.right_ear,
            avg_ear: features.avg_ear,
            baseline_ear: Some(baseline_ear),
            normalized_ear: Some(smoothed),
            head_pose: features.head_pose,
            blink_detected,
            blink_rate,
            blink_entropy,
            perclos,
            fatigue_score: score.total,
            fatigue_level,
            confidence,
            sustained_low_ear,
            unstable_signal,
            held: false,
            timestamp_ms: now_ms,
        })
    }

    fn face_absent(&mut self, now_ms: u64) -> FatigueResult {
        match self.state.last_face_seen_ms {
            Some(seen) if now_ms.saturating_sub(seen) <= self.config.face_lost_grace_ms => {
                FatigueResult::hold(
                    now_ms,
                    self.resolver.level(),
                    self.calibrator.is_calibrating(),
                    self.calibrator.progress_pct(),
                )
            }
            Some(seen) => {
                info!(absent_ms = now_ms - seen, "Face lost past grace period, resetting");
                self.reset_state();
                FatigueResult::no_face(now_ms)
            }
            None => FatigueResult::no_face(now_ms),
        }
    }

    fn is_unstable(&self) -> bool {
        let history = &self.state.normalized_ear_history;
        if history.len() < self.config.stability.min_samples {
            return false;
        }
        let values: Vec<f64> = history.values().copied().collect();
        StatisticalFeatures::compute(&values).variance > self.config.stability.unstable_variance
    }

    /// Reset all temporal state (continuity break or subject change)
    pub fn reset_state(&mut self) {
        self.calibrator.reset();
        self.blink_detector.reset();
        self.blink_window.reset();
        self.perclos.reset();
        self.resolver.reset();
        self.state.reset();
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn baseline_ear(&self) -> Option<f64> {
        self.calibrator.baseline_ear()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_calibrating()
    }

    pub fn level(&self) -> FatigueLevel {
        self.resolver.level()
    }

    /// Blinks registered since the last reset
    pub fn total_blinks(&self) -> u64 {
        self.blink_detector.total_blinks()
    }
}
