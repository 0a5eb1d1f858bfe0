//! Per-session stage wiring

use std::sync::Arc;
use std::time::Duration;

use alerting::{AlertConfig, AlertDecision, AlertGate, AlertSink};
use dms::{ConfidenceSmoother, DmsConfig, DmsModule, FatigueLevel, FatigueResult};
use feature_engine::LandmarkFrame;
use storage::{SessionSummary, StorageSink};
use telemetry::{DataQualitySnapshot, SessionTracker, TelemetryConfig, WindowLogger};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cadence::ScanConfig;
use crate::guard::ScanGuard;
use crate::source::FrameSource;
use crate::{CaptureError, PipelineError};

/// What one evaluated frame produced
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub result: FatigueResult,
    /// Smoothed confidence for display
    pub display_confidence: f64,
    pub alert: AlertDecision,
    pub window_log_stored: bool,
    /// Cadence chosen for the next scan
    pub scan_interval_ms: u64,
}

/// Every stage of one monitoring session, owned in one place
pub struct FatiguePipeline<S> {
    source: Arc<S>,
    dms: DmsModule,
    gate: AlertGate,
    alert_sink: Arc<dyn AlertSink>,
    storage: Arc<dyn StorageSink>,
    window_logger: WindowLogger,
    session: SessionTracker,
    smoother: ConfidenceSmoother,
    scan_config: ScanConfig,
    guard: ScanGuard,
    level: Option<FatigueLevel>,
    failed_frames: u64,
}

impl<S: FrameSource> FatiguePipeline<S> {
    pub fn builder() -> FatiguePipelineBuilder<S> {
        FatiguePipelineBuilder::new()
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    pub fn guard(&self) -> &ScanGuard {
        &self.guard
    }

    /// Interval until the next scan, from the latest decisive level
    pub fn scan_interval(&self) -> Duration {
        self.scan_config.interval(self.level)
    }

    /// Begin a new session; all rolling state starts from scratch
    pub fn start_session(&mut self, now_ms: u64) -> Uuid {
        let session_id = self.session.start(now_ms);
        self.window_logger.set_session(session_id);
        self.gate.take_alerts_fired();
        self.failed_frames = 0;
        self.reset_continuity();
        session_id
    }

    /// Finalize and store the session summary
    pub fn end_session(&mut self, now_ms: u64) -> Option<SessionSummary> {
        let summary = self.session.end(now_ms, self.gate.take_alerts_fired())?;
        if let Err(e) = self.storage.store_session_summary(summary.clone()) {
            warn!(error = %e, session = %summary.session_id, "Failed to store session summary");
        }
        Some(summary)
    }

    /// Continuity break: calibration, blink, alert and smoothing state restart
    pub fn reset_continuity(&mut self) {
        self.dms.reset_state();
        self.gate.reset();
        self.smoother.reset();
        self.window_logger.reset();
        self.level = None;
        info!("Continuity reset");
    }

    /// Handle the outcome of one capture; `None` means the frame was dropped
    pub fn on_capture(
        &mut self,
        captured: Result<Option<LandmarkFrame>, CaptureError>,
        now_ms: u64,
    ) -> Option<FrameReport> {
        let frame = match captured {
            Ok(frame) => frame,
            Err(e) => {
                self.drop_frame("capture", &e);
                return None;
            }
        };

        match self.dms.analyze(frame.as_ref(), now_ms) {
            Ok(result) => Some(self.handle_result(result, now_ms)),
            Err(e) => {
                self.drop_frame("analysis", &e);
                None
            }
        }
    }

    fn drop_frame(&mut self, stage: &'static str, error: &dyn std::error::Error) {
        self.failed_frames += 1;
        metrics::counter!("fatigue_frames_dropped_total", "stage" => stage).increment(1);
        warn!(stage, error = %error, "Frame dropped");
    }

    fn handle_result(&mut self, result: FatigueResult, now_ms: u64) -> FrameReport {
        metrics::counter!("fatigue_frames_analyzed_total").increment(1);
        self.session.track(&result);

        if !result.face_detected {
            // The analyzer already reset itself; bring the gate in line
            self.gate.reset();
            self.smoother.reset();
            self.level = None;
        } else if result.is_decisive() {
            self.level = Some(result.fatigue_level);
            metrics::gauge!("fatigue_score").set(result.fatigue_score);
        }

        let display_confidence = if result.face_detected && !result.held {
            self.smoother.update(result.confidence)
        } else {
            self.smoother.value()
        };

        let alert = self.gate.evaluate(&result, now_ms);
        if let AlertDecision::Fire(pattern) = &alert {
            metrics::counter!(
                "fatigue_alerts_fired_total",
                "level" => result.fatigue_level.as_str()
            )
            .increment(1);
            if let Err(e) = self.alert_sink.play(*pattern) {
                warn!(error = %e, ?pattern, "Alert playback failed");
            }
        }

        let scan_interval_ms = self.scan_config.interval_ms(self.level);
        let window_log_stored = match self.window_logger.process(&result, scan_interval_ms) {
            Some(log) => match self.storage.store_window_log(log) {
                Ok(()) => {
                    metrics::counter!("fatigue_window_logs_stored_total").increment(1);
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Failed to store window log");
                    false
                }
            },
            None => false,
        };

        debug!(
            level = %result.fatigue_level,
            calibrating = result.is_calibrating,
            display_confidence,
            scan_interval_ms,
            "Frame evaluated"
        );

        FrameReport {
            result,
            display_confidence,
            alert,
            window_log_stored,
            scan_interval_ms,
        }
    }

    pub fn dms(&self) -> &DmsModule {
        &self.dms
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.session_id()
    }

    pub fn level(&self) -> Option<FatigueLevel> {
        self.level
    }

    /// Frame-quality counters of the running session
    pub fn quality(&self) -> DataQualitySnapshot {
        self.session.quality()
    }

    /// Alerts fired in the running session
    pub fn alerts_fired(&self) -> u32 {
        self.gate.alerts_fired()
    }

    /// Captures or analyses that failed this session
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }
}

/// Builder for [`FatiguePipeline`]; the frame source, alert sink and storage are required
pub struct FatiguePipelineBuilder<S> {
    source: Option<S>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    storage: Option<Arc<dyn StorageSink>>,
    dms_config: DmsConfig,
    alert_config: AlertConfig,
    telemetry_config: TelemetryConfig,
    scan_config: ScanConfig,
    device_id: String,
}

impl<S: FrameSource> FatiguePipelineBuilder<S> {
    pub fn new() -> Self {
        Self {
            source: None,
            alert_sink: None,
            storage: None,
            dms_config: DmsConfig::default(),
            alert_config: AlertConfig::default(),
            telemetry_config: TelemetryConfig::default(),
            scan_config: ScanConfig::default(),
            device_id: "unknown-device".to_string(),
        }
    }

    pub fn source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn dms_config(mut self, config: DmsConfig) -> Self {
        self.dms_config = config;
        self
    }

    pub fn alert_config(mut self, config: AlertConfig) -> Self {
        self.alert_config = config;
        self
    }

    pub fn telemetry_config(mut self, config: TelemetryConfig) -> Self {
        self.telemetry_config = config;
        self
    }

    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Wire every stage; fails if a required capability is missing
    pub fn build(self) -> Result<FatiguePipeline<S>, PipelineError> {
        let source = self
            .source
            .ok_or(PipelineError::MissingCapability("frame source"))?;
        let alert_sink = self
            .alert_sink
            .ok_or(PipelineError::MissingCapability("alert sink"))?;
        let storage = self
            .storage
            .ok_or(PipelineError::MissingCapability("storage sink"))?;
        let dms = DmsModule::new(self.dms_config)?;

        let session =
            SessionTracker::with_low_confidence(self.telemetry_config.drop_confidence_below);
        let window_logger =
            WindowLogger::new(self.telemetry_config, &self.device_id, Uuid::nil());

        Ok(FatiguePipeline {
            source: Arc::new(source),
            dms,
            gate: AlertGate::new(self.alert_config),
            alert_sink,
            storage,
            window_logger,
            session,
            smoother: ConfidenceSmoother::default(),
            scan_config: self.scan_config,
            guard: ScanGuard::new(),
            level: None,
            failed_frames: 0,
        })
    }
}

impl<S: FrameSource> Default for FatiguePipelineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SlotFrameSource;
    use alerting::{AlertPattern, MemoryAlertSink};
    use storage::Repository;

    struct Harness {
        pipeline: FatiguePipeline<SlotFrameSource>,
        alerts: Arc<MemoryAlertSink>,
        repo: Arc<Repository>,
    }

    fn harness() -> Harness {
        let alerts = Arc::new(MemoryAlertSink::new());
        let repo = Arc::new(Repository::new());
        let pipeline = FatiguePipeline::builder()
            .source(SlotFrameSource::new())
            .alert_sink(alerts.clone())
            .storage(repo.clone())
            .device_id("test-device")
            .build()
            .unwrap();
        Harness {
            pipeline,
            alerts,
            repo,
        }
    }

    fn frame(ear: f64) -> Option<LandmarkFrame> {
        Some(LandmarkFrame::synthetic(ear, ear, 10.0, 0.0, 640, 480))
    }

    #[test]
    fn test_missing_capabilities_fail_at_build() {
        let missing_source = FatiguePipeline::<SlotFrameSource>::builder()
            .alert_sink(Arc::new(MemoryAlertSink::new()))
            .storage(Arc::new(Repository::new()))
            .build();
        assert!(matches!(
            missing_source,
            Err(PipelineError::MissingCapability("frame source"))
        ));

        let missing_sink = FatiguePipeline::builder()
            .source(SlotFrameSource::new())
            .storage(Arc::new(Repository::new()))
            .build();
        assert!(matches!(
            missing_sink,
            Err(PipelineError::MissingCapability("alert sink"))
        ));
    }

    #[test]
    fn test_invalid_dms_config_fails_at_build() {
        let mut config = DmsConfig::default();
        config.calibration.duration_ms = 0;
        let result = FatiguePipeline::builder()
            .source(SlotFrameSource::new())
            .alert_sink(Arc::new(MemoryAlertSink::new()))
            .storage(Arc::new(Repository::new()))
            .dms_config(config)
            .build();
        assert!(matches!(result, Err(PipelineError::Dms(_))));
    }

    #[test]
    fn test_failed_capture_is_a_dropped_frame() {
        let mut h = harness();
        h.pipeline.start_session(0);
        assert!(h.pipeline.on_capture(Err(CaptureError::Timeout), 0).is_none());
        assert_eq!(h.pipeline.failed_frames(), 1);
        assert_eq!(h.pipeline.quality().total_frames, 0);
    }

    #[test]
    fn test_drowsy_session_alerts_and_logs() {
        let mut h = harness();
        h.pipeline.start_session(0);

        let mut now = 0;
        while now < 8000 {
            h.pipeline.on_capture(Ok(frame(0.30)), now).unwrap();
            now += 250;
        }
        assert!(!h.pipeline.dms().is_calibrating());
        assert!(h.alerts.played().is_empty());

        while now < 25_000 {
            h.pipeline.on_capture(Ok(frame(0.10)), now).unwrap();
            now += 250;
        }

        let played = h.alerts.played();
        assert!(!played.is_empty());
        assert_eq!(played[0], AlertPattern::Short);
        assert_eq!(h.pipeline.level(), Some(FatigueLevel::High));
        assert_eq!(h.pipeline.scan_interval(), Duration::from_millis(800));
        assert!(h.repo.window_log_count() > 0);

        let summary = h.pipeline.end_session(now).unwrap();
        assert_eq!(summary.peak_fatigue_level, FatigueLevel::High);
        assert_eq!(summary.alert_count as usize, played.len());
        assert!(summary.baseline_successful);
        assert_eq!(h.repo.session_count(), 1);
    }

    #[test]
    fn test_calibration_frames_are_not_logged() {
        let mut h = harness();
        h.pipeline.start_session(0);
        let report = h.pipeline.on_capture(Ok(frame(0.30)), 0).unwrap();

        assert!(report.result.is_calibrating);
        assert!(!report.window_log_stored);
        assert_eq!(report.scan_interval_ms, 2000);
        assert_eq!(h.repo.window_log_count(), 0);
    }

    #[test]
    fn test_continuity_reset_restarts_calibration() {
        let mut h = harness();
        h.pipeline.start_session(0);
        let mut now = 0;
        while h.pipeline.dms().is_calibrating() {
            h.pipeline.on_capture(Ok(frame(0.30)), now);
            now += 250;
        }

        h.pipeline.reset_continuity();
        let report = h.pipeline.on_capture(Ok(frame(0.30)), now).unwrap();
        assert!(report.result.is_calibrating);
        assert_eq!(report.result.calibration_progress, 0.0);
        assert_eq!(h.pipeline.level(), None);
    }

    #[test]
    fn test_display_confidence_is_smoothed() {
        let mut h = harness();
        h.pipeline.start_session(0);
        let first = h.pipeline.on_capture(Ok(frame(0.30)), 0).unwrap();
        assert!((first.display_confidence - 1.0).abs() < 1e-9);

        let second = h.pipeline.on_capture(Ok(frame(0.05)), 250).unwrap();
        // raw 0.8, alpha 0.25
        assert!((second.display_confidence - 0.95).abs() < 1e-9);
    }
}
