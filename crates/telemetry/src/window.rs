//! Window-level fatigue logging

use dms::FatigueResult;
use feature_engine::StatisticalFeatures;
use frame_buffer::TimeWindow;
use sha2::{Digest, Sha256};
use storage::{WindowLog, WINDOW_LOG_SCHEMA};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::TelemetryConfig;

/// SHA-256 of a device identifier as lowercase hex
pub fn hash_device_id(device_id: &str) -> String {
    hex::encode(Sha256::digest(device_id.as_bytes()))
}

/// Builds window logs from a stream of fatigue results
#[derive(Debug, Clone)]
pub struct WindowLogger {
    config: TelemetryConfig,
    session_id: Uuid,
    device_hash: String,
    normalized_ears: TimeWindow<f64>,
    face_flags: TimeWindow<bool>,
}

impl WindowLogger {
    pub fn new(config: TelemetryConfig, device_id: &str, session_id: Uuid) -> Self {
        Self {
            normalized_ears: TimeWindow::new(config.window_ms),
            face_flags: TimeWindow::new(config.window_ms),
            device_hash: hash_device_id(device_id),
            session_id,
            config,
        }
    }

    /// Feed one result; returns the log to store if the result qualifies
    pub fn process(&mut self, result: &FatigueResult, scan_interval_ms: u64) -> Option<WindowLog> {
        let now = result.timestamp_ms;
        let face_present = result.face_detected && !result.held;
        self.face_flags.push(now, face_present);
        if let Some(normalized) = result.normalized_ear {
            self.normalized_ears.push(now, normalized);
        }

        if !result.face_detected || result.held {
            trace!("Window log skipped: no face");
            return None;
        }
        if result.is_calibrating {
            trace!("Window log skipped: calibrating");
            return None;
        }
        if result.confidence < self.config.drop_confidence_below {
            debug!(
                confidence = result.confidence,
                threshold = self.config.drop_confidence_below,
                "Window log dropped: low confidence"
            );
            return None;
        }

        self.normalized_ears.purge(now);
        self.face_flags.purge(now);
        let values: Vec<f64> = self.normalized_ears.values().copied().collect();
        let ear_stats = StatisticalFeatures::compute(&values);

        Some(WindowLog {
            schema_version: WINDOW_LOG_SCHEMA.to_string(),
            session_id: self.session_id,
            device_id_hash: self.device_hash.clone(),
            platform: self.config.platform.clone(),
            timestamp_ms: now,
            window_duration_ms: self.config.window_ms,
            baseline_ear: result.baseline_ear,
            normalized_ear_mean: ear_stats.mean,
            normalized_ear_variance: ear_stats.variance,
            blink_rate: result.blink_rate,
            blink_entropy: result.blink_entropy,
            perclos: result.perclos,
            sustained_low_ear: result.sustained_low_ear,
            fatigue_level: result.fatigue_level,
            confidence: result.confidence,
            low_confidence: result.confidence < self.config.flag_confidence_below,
            unstable_signal: result.unstable_signal,
            low_liveness: result.low_liveness(self.config.low_liveness_entropy),
            scan_interval_ms,
            face_detected_ratio: self.face_detected_ratio(),
        })
    }

    /// Share of recent frames with a face actually in view
    pub fn face_detected_ratio(&self) -> f64 {
        if self.face_flags.is_empty() {
            return 0.0;
        }
        let present = self.face_flags.values().filter(|&&present| present).count();
        present as f64 / self.face_flags.len() as f64
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn device_hash(&self) -> &str {
        &self.device_hash
    }

    /// Start logging for a new session
    pub fn set_session(&mut self, session_id: Uuid) {
        self.session_id = session_id;
        self.reset();
    }

    /// Drop aggregated window state (continuity break)
    pub fn reset(&mut self) {
        self.normalized_ears.clear();
        self.face_flags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::FatigueLevel;

    fn decisive(ts: u64, normalized: f64, confidence: f64) -> FatigueResult {
        FatigueResult {
            face_detected: true,
            is_calibrating: false,
            baseline_ear: Some(0.28),
            normalized_ear: Some(normalized),
            blink_rate: 12.0,
            fatigue_level: FatigueLevel::Medium,
            confidence,
            timestamp_ms: ts,
            ..Default::default()
        }
    }

    fn logger() -> WindowLogger {
        WindowLogger::new(TelemetryConfig::default(), "device-1", Uuid::nil())
    }

    #[test]
    fn test_device_hash_is_sha256_hex() {
        assert_eq!(
            hash_device_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(logger().device_hash().len(), 64);
    }

    #[test]
    fn test_qualifying_result_is_logged() {
        let mut logger = logger();
        let log = logger.process(&decisive(1000, 0.9, 0.9), 1200).unwrap();

        assert!(log.validate().is_ok());
        assert_eq!(log.fatigue_level, FatigueLevel::Medium);
        assert_eq!(log.scan_interval_ms, 1200);
        assert!(!log.low_confidence);
        assert!((log.normalized_ear_mean - 0.9).abs() < 1e-9);
        assert_eq!(log.face_detected_ratio, 1.0);
    }

    #[test]
    fn test_drop_and_flag_thresholds_are_independent() {
        let mut logger = logger();
        assert!(logger.process(&decisive(0, 1.0, 0.3), 2000).is_none());

        let flagged = logger.process(&decisive(100, 1.0, 0.5), 2000).unwrap();
        assert!(flagged.low_confidence);
    }

    #[test]
    fn test_calibrating_and_no_face_skipped() {
        let mut logger = logger();
        let calibrating = FatigueResult {
            is_calibrating: true,
            ..decisive(0, 1.0, 0.9)
        };
        assert!(logger.process(&calibrating, 2000).is_none());
        assert!(logger.process(&FatigueResult::no_face(100), 2000).is_none());
    }

    #[test]
    fn test_window_statistics_and_face_ratio() {
        let mut logger = logger();
        logger.process(&FatigueResult::no_face(0), 2000);
        logger.process(&decisive(1000, 0.8, 0.9), 2000);
        let log = logger.process(&decisive(2000, 1.0, 0.9), 2000).unwrap();

        assert!((log.normalized_ear_mean - 0.9).abs() < 1e-9);
        assert!((log.normalized_ear_variance - 0.01).abs() < 1e-9);
        assert!((log.face_detected_ratio - 2.0 / 3.0).abs() < 1e-9);

        // The no-face frame ages out of the 20s window
        let log = logger.process(&decisive(20_500, 1.0, 0.9), 2000).unwrap();
        assert_eq!(log.face_detected_ratio, 1.0);
    }

    #[test]
    fn test_low_liveness_flag() {
        let mut logger = logger();
        let regular = FatigueResult {
            blink_entropy: Some(0.2),
            ..decisive(0, 1.0, 0.9)
        };
        assert!(logger.process(&regular, 2000).unwrap().low_liveness);

        let unknown = decisive(100, 1.0, 0.9);
        assert!(!logger.process(&unknown, 2000).unwrap().low_liveness);
    }
}
