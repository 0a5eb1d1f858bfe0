//! Synthetic scan session for demos

use std::sync::Arc;
use std::time::Duration;

use alerting::LogAlertSink;
use scan_scheduler::{
    FatiguePipeline, PipelineError, ScanReport, ScanScheduler, SyntheticFrameSource,
};
use storage::StorageSink;
use tokio::task::JoinHandle;
use tracing::info;

use crate::settings::AppConfig;

/// Run one scan session over a scripted drowsy subject, stopping after
/// `demo.duration_secs`. Window logs and the summary go to `storage`.
pub fn spawn_demo(
    config: &AppConfig,
    storage: Arc<dyn StorageSink>,
) -> Result<JoinHandle<ScanReport>, PipelineError> {
    let pipeline = FatiguePipeline::builder()
        .source(SyntheticFrameSource::drowsy_after(config.demo.drowsy_after_ms))
        .alert_sink(Arc::new(LogAlertSink))
        .storage(storage)
        .dms_config(config.dms.clone())
        .alert_config(config.alert.clone())
        .telemetry_config(config.telemetry.clone())
        .scan_config(config.scan.clone())
        .device_id(config.demo.device_id.clone())
        .build()?;

    let (scheduler, handle) = ScanScheduler::new(pipeline);
    let duration = Duration::from_secs(config.demo.duration_secs);
    info!(?duration, "Starting demo scan session");

    Ok(tokio::spawn(async move {
        let stop_after = async move {
            tokio::time::sleep(duration).await;
            handle.stop().await;
        };
        let (report, ()) = tokio::join!(scheduler.run(), stop_after);
        info!(
            frames = report.quality.total_frames,
            skipped = report.skipped_scans,
            peak = ?report.summary.as_ref().map(|s| s.peak_fatigue_level),
            "Demo session finished"
        );
        report
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::Repository;

    #[tokio::test(start_paused = true)]
    async fn test_demo_session_fills_repository() {
        let mut config = AppConfig::default();
        config.demo.drowsy_after_ms = 20_000;
        config.demo.duration_secs = 60;

        let repo = Arc::new(Repository::new());
        let report = spawn_demo(&config, repo.clone()).unwrap().await.unwrap();

        let summary = report.summary.unwrap();
        assert!(summary.baseline_successful);
        assert!(summary.frame_count > 0);
        assert_eq!(repo.session_count(), 1);
        assert!(repo.window_log_count() > 0);
    }

    #[test]
    fn test_invalid_dms_config_is_rejected() {
        let mut config = AppConfig::default();
        config.dms.calibration.duration_ms = 0;
        let repo = Arc::new(Repository::new());
        // Builder validates before anything is spawned
        assert!(matches!(
            spawn_demo(&config, repo),
            Err(PipelineError::Dms(_))
        ));
    }
}
