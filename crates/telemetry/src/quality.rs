//! Data-quality counters, kept separate from fatigue outcomes

use dms::{FatigueLevel, FatigueResult};
use storage::DataQualitySnapshot;

/// Counts frame outcomes to monitor signal quality
#[derive(Debug, Clone)]
pub struct DataQualityTracker {
    low_confidence_below: f64,
    counts: DataQualitySnapshot,
    confidence_sum: f64,
}

impl DataQualityTracker {
    pub fn new(low_confidence_below: f64) -> Self {
        Self {
            low_confidence_below,
            counts: DataQualitySnapshot::default(),
            confidence_sum: 0.0,
        }
    }

    /// Classify one result into exactly one quality bucket
    pub fn record(&mut self, result: &FatigueResult) {
        let c = &mut self.counts;
        c.total_frames += 1;

        if !result.face_detected || result.held {
            c.dropped_frames += 1;
            return;
        }
        c.face_detected_frames += 1;

        if result.is_calibrating {
            c.calibration_frames += 1;
            return;
        }
        if result.confidence < self.low_confidence_below {
            c.low_confidence_frames += 1;
            return;
        }

        c.valid_fatigue_frames += 1;
        self.confidence_sum += result.confidence;
        if result.fatigue_level == FatigueLevel::High {
            c.high_fatigue_frames += 1;
        }
    }

    pub fn snapshot(&self) -> DataQualitySnapshot {
        let avg_confidence = if self.counts.valid_fatigue_frames > 0 {
            self.confidence_sum / self.counts.valid_fatigue_frames as f64
        } else {
            0.0
        };
        DataQualitySnapshot {
            avg_confidence,
            ..self.counts
        }
    }

    pub fn reset(&mut self) {
        self.counts = DataQualitySnapshot::default();
        self.confidence_sum = 0.0;
    }
}

impl Default for DataQualityTracker {
    fn default() -> Self {
        Self::new(0.4)
    }
}
