//! Continuous fatigue score

use feature_engine::HeadPose;
use serde::{Deserialize, Serialize};

use crate::config::ScoreConfig;

/// Weighted fatigue score with its components, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FatigueScore {
    pub ear: f64,
    pub blink: f64,
    pub pose: f64,
    pub total: f64,
}

/// Combines normalized EAR, blink rate / PERCLOS and head pose
#[derive(Debug, Clone, Default)]
pub struct FatigueScorer {
    config: ScoreConfig,
}

impl FatigueScorer {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    /// Clamp `avg_ear / baseline_ear` into the configured band
    pub fn normalize_ear(&self, avg_ear: f64, baseline_ear: f64) -> f64 {
        let ratio = if baseline_ear > 0.0 { avg_ear / baseline_ear } else { 1.0 };
        ratio.clamp(self.config.normalized_ear_min, self.config.normalized_ear_max)
    }

    pub fn score(
        &self,
        normalized_ear: f64,
        blink_rate: f64,
        perclos: f64,
        head_pose: HeadPose,
    ) -> FatigueScore {
        let c = &self.config;

        let ear = unit((1.0 - normalized_ear) / c.ear_full_scale);
        let rate_component = unit((blink_rate - c.blink_rate_onset) / c.blink_rate_span);
        let perclos_component = unit(perclos / c.perclos_full_scale);
        let blink = rate_component.max(perclos_component);
        let pose = match head_pose {
            HeadPose::Center => 0.0,
            HeadPose::Up => c.pose_up,
            HeadPose::Down => c.pose_down,
        };

        let weight_sum = c.ear_weight + c.blink_weight + c.pose_weight;
        let total =
            (c.ear_weight * ear + c.blink_weight * blink + c.pose_weight * pose) / weight_sum;

        FatigueScore {
            ear,
            blink,
            pose,
            total: unit(total),
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
