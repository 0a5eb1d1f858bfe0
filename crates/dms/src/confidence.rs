//! Measurement confidence
//!
//! Confidence describes how far the landmark readings can be trusted, not how
//! tired the subject is.

use feature_engine::{FatigueFeatures, HeadPose};

use crate::config::ConfidenceConfig;

/// Penalty-based reliability score
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Score in `[floor, ceiling]` (default `[0.5, 1.0]`)
    pub fn score(&self, avg_ear: f64, mouth_open_dist: f64, head_pose: HeadPose) -> f64 {
        let c = &self.config;
        let mut score = 1.0;

        if avg_ear < c.ear_min || avg_ear > c.ear_max {
            score -= c.ear_penalty;
        }
        if mouth_open_dist > c.mouth_extreme_px {
            score -= c.mouth_penalty;
        }
        if head_pose != HeadPose::Center {
            score -= c.pose_penalty;
        }

        score.clamp(c.floor, c.ceiling)
    }

    pub fn score_features(&self, features: &FatigueFeatures) -> f64 {
        self.score(features.avg_ear, features.mouth_open_dist, features.head_pose)
    }
}

/// Exponential moving average seeded by its first input
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    pub fn update(&mut self, next: f64) -> f64 {
        let value = match self.value {
            Some(prev) => self.alpha * next + (1.0 - self.alpha) * prev,
            None => next,
        };
        self.value = Some(value);
        value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Display-side confidence smoothing, clamped to `[0, 1]`
#[derive(Debug, Clone)]
pub struct ConfidenceSmoother {
    ema: Ema,
}

impl ConfidenceSmoother {
    pub const DEFAULT_ALPHA: f64 = 0.25;

    pub fn new(alpha: f64) -> Self {
        Self { ema: Ema::new(alpha) }
    }

    pub fn update(&mut self, raw: f64) -> f64 {
        self.ema.update(raw).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> f64 {
        self.ema.value().unwrap_or(0.0).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.ema.reset();
    }
}

impl Default for ConfidenceSmoother {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_reading_is_full_confidence() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.score(0.28, 10.0, HeadPose::Center), 1.0);
    }

    #[test]
    fn test_penalties_accumulate_to_floor() {
        let scorer = ConfidenceScorer::default();
        assert!((scorer.score(0.28, 10.0, HeadPose::Down) - 0.9).abs() < 1e-9);
        assert!((scorer.score(0.10, 10.0, HeadPose::Center) - 0.8).abs() < 1e-9);
        // Three penalties meet the floor
        assert!((scorer.score(0.0, 1000.0, HeadPose::Up) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_smoother_seeds_then_blends() {
        let mut smoother = ConfidenceSmoother::default();
        assert_eq!(smoother.update(0.8), 0.8);
        assert!((smoother.update(0.4) - 0.7).abs() < 1e-9);
        smoother.reset();
        assert_eq!(smoother.value(), 0.0);
    }

    #[test]
    fn test_smoother_clamps() {
        let mut smoother = ConfidenceSmoother::new(1.0);
        assert_eq!(smoother.update(1.7), 1.0);
        assert_eq!(smoother.update(-0.3), 0.0);
    }

    proptest! {
        #[test]
        fn prop_confidence_always_in_band(
            ear in -1.0f64..5.0,
            mouth in -100.0f64..5000.0,
            pose in prop_oneof![Just(HeadPose::Up), Just(HeadPose::Down), Just(HeadPose::Center)],
        ) {
            let score = ConfidenceScorer::default().score(ear, mouth, pose);
            prop_assert!((0.5..=1.0).contains(&score));
        }
    }
}
