//! Session-level aggregation

use dms::{FatigueLevel, FatigueResult};
use storage::{DataQualitySnapshot, LevelDistribution, SessionSummary, SESSION_SUMMARY_SCHEMA};
use tracing::{debug, info};
use uuid::Uuid;

use crate::quality::DataQualityTracker;

/// Running aggregate from session start to session end
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    session_id: Option<Uuid>,
    start_ms: u64,
    level_counts: [u64; 3],
    confidence_sum: f64,
    baseline_successful: bool,
    quality: DataQualityTracker,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames below `low_confidence_below` count as low-confidence in the quality counters
    pub fn with_low_confidence(low_confidence_below: f64) -> Self {
        Self {
            quality: DataQualityTracker::new(low_confidence_below),
            ..Self::default()
        }
    }

    fn clear(&mut self) {
        self.session_id = None;
        self.start_ms = 0;
        self.level_counts = [0; 3];
        self.confidence_sum = 0.0;
        self.baseline_successful = false;
        self.quality.reset();
    }

    /// Begin a new session, discarding any unfinished one
    pub fn start(&mut self, now_ms: u64) -> Uuid {
        if let Some(previous) = self.session_id {
            debug!(%previous, "Discarding unfinished session");
        }
        let session_id = Uuid::new_v4();
        self.clear();
        self.session_id = Some(session_id);
        self.start_ms = now_ms;
        info!(%session_id, "Session started");
        session_id
    }

    /// Count one result. Every result feeds the quality counters; only
    /// decisive results feed the level distribution.
    pub fn track(&mut self, result: &FatigueResult) {
        if self.session_id.is_none() {
            return;
        }
        self.quality.record(result);
        if !result.is_decisive() {
            return;
        }
        self.level_counts[level_index(result.fatigue_level)] += 1;
        self.confidence_sum += result.confidence;
        if result.baseline_ear.is_some() {
            self.baseline_successful = true;
        }
    }

    /// Finalize the running session; the tracker is empty afterwards
    pub fn end(&mut self, now_ms: u64, alert_count: u32) -> Option<SessionSummary> {
        let session_id = self.session_id.take()?;
        let end_ms = now_ms.max(self.start_ms);
        let frames = self.frame_count();
        let total = frames.max(1) as f64;

        let peak_fatigue_level = FatigueLevel::ALL
            .into_iter()
            .rev()
            .find(|&level| self.level_counts[level_index(level)] > 0)
            .unwrap_or(FatigueLevel::Low);

        let summary = SessionSummary {
            schema_version: SESSION_SUMMARY_SCHEMA.to_string(),
            session_id,
            start_ms: self.start_ms,
            end_ms,
            duration_ms: end_ms - self.start_ms,
            avg_confidence: self.confidence_sum / total,
            peak_fatigue_level,
            distribution: LevelDistribution {
                low: self.level_counts[0] as f64 / total,
                medium: self.level_counts[1] as f64 / total,
                high: self.level_counts[2] as f64 / total,
            },
            baseline_successful: self.baseline_successful,
            alert_count,
            frame_count: frames,
            frame_quality: self.quality.snapshot(),
        };
        info!(
            %session_id,
            duration_ms = summary.duration_ms,
            frames,
            peak = %peak_fatigue_level,
            alert_count,
            "Session ended"
        );

        self.clear();
        Some(summary)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }

    /// Decisive frames counted so far
    pub fn frame_count(&self) -> u64 {
        self.level_counts.iter().sum()
    }

    /// Quality counters of the running session
    pub fn quality(&self) -> DataQualitySnapshot {
        self.quality.snapshot()
    }
}

fn level_index(level: FatigueLevel) -> usize {
    match level {
        FatigueLevel::Low => 0,
        FatigueLevel::Medium => 1,
        FatigueLevel::High => 2,
    }
}
