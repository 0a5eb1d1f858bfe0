//! Per-session baseline EAR calibration

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CalibrationConfig;

/// Calibration state for one continuity segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// First sample time
    pub started_at_ms: Option<u64>,
    /// Accepted EAR samples, in arrival order
    pub samples: Vec<f64>,
    /// Locked baseline, set at most once per session
    pub baseline_ear: Option<f64>,
    /// Highest progress reported so far (percent)
    pub progress_pct: f64,
}

impl CalibrationState {
    pub fn is_calibrating(&self) -> bool {
        self.baseline_ear.is_none()
    }
}

/// Outcome of feeding one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStatus {
    /// Still sampling; progress is monotonic within a segment
    Calibrating { progress_pct: f64 },
    /// Baseline available
    Ready { baseline_ear: f64 },
}

/// Collects resting EAR samples and locks an individual baseline
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    config: CalibrationConfig,
    state: CalibrationState,
}

impl BaselineCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: CalibrationState::default(),
        }
    }

    /// Feed a raw average EAR sample
    pub fn update(&mut self, avg_ear: f64, now_ms: u64) -> CalibrationStatus {
        if let Some(baseline_ear) = self.state.baseline_ear {
            return CalibrationStatus::Ready { baseline_ear };
        }

        let started = *self.state.started_at_ms.get_or_insert_with(|| {
            debug!(now_ms, "Baseline calibration started");
            now_ms
        });

        if avg_ear > self.config.plausible_min_ear && avg_ear < self.config.plausible_max_ear {
            self.state.samples.push(avg_ear);
        }

        let elapsed = now_ms.saturating_sub(started);
        let progress = (elapsed as f64 / self.config.duration_ms as f64 * 100.0).min(100.0);
        self.state.progress_pct = self.state.progress_pct.max(progress);

        if elapsed >= self.config.duration_ms
            && self.state.samples.len() >= self.config.min_samples
        {
            let mean = self.state.samples.iter().sum::<f64>() / self.state.samples.len() as f64;
            let baseline_ear = mean.max(self.config.min_baseline_ear);
            info!(
                baseline_ear,
                samples = self.state.samples.len(),
                elapsed_ms = elapsed,
                "Baseline locked"
            );
            self.state.baseline_ear = Some(baseline_ear);
            self.state.samples.clear();
            self.state.progress_pct = 100.0;
            return CalibrationStatus::Ready { baseline_ear };
        }

        CalibrationStatus::Calibrating {
            progress_pct: self.state.progress_pct,
        }
    }

    pub fn is_calibrating(&self) -> bool {
        self.state.is_calibrating()
    }

    pub fn baseline_ear(&self) -> Option<f64> {
        self.state.baseline_ear
    }

    pub fn progress_pct(&self) -> f64 {
        self.state.progress_pct
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Discard any baseline and restart from zero
    pub fn reset(&mut self) {
        self.state = CalibrationState::default();
    }
}
