//! Scan loop implementation

use feature_engine::LandmarkFrame;
use storage::SessionSummary;
use telemetry::DataQualitySnapshot;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::pipeline::FatiguePipeline;
use crate::source::FrameSource;
use crate::CaptureError;

/// Continuity and lifecycle events from the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// App went to the background: stop scanning and discard rolling state
    Background,
    /// App is visible again: resume scanning from a fresh calibration
    Foreground,
    /// Explicit reset request
    Reset,
    /// End the session
    Stop,
}

/// Sender side for lifecycle signals
#[derive(Debug, Clone)]
pub struct ScanHandle {
    tx: mpsc::Sender<LifecycleSignal>,
}

impl ScanHandle {
    pub async fn send(&self, signal: LifecycleSignal) -> bool {
        self.tx.send(signal).await.is_ok()
    }

    pub async fn background(&self) -> bool {
        self.send(LifecycleSignal::Background).await
    }

    pub async fn foreground(&self) -> bool {
        self.send(LifecycleSignal::Foreground).await
    }

    pub async fn reset(&self) -> bool {
        self.send(LifecycleSignal::Reset).await
    }

    pub async fn stop(&self) -> bool {
        self.send(LifecycleSignal::Stop).await
    }
}

/// Final state of a finished scan session
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub summary: Option<SessionSummary>,
    pub quality: DataQualitySnapshot,
    /// Scans skipped because a capture was still in flight
    pub skipped_scans: u64,
    pub failed_frames: u64,
    pub alerts_fired: u32,
}

type Captured = (u64, Result<Option<LandmarkFrame>, CaptureError>);

/// Drives a [`FatiguePipeline`] on its adaptive cadence
pub struct ScanScheduler<S> {
    pipeline: FatiguePipeline<S>,
    signals: mpsc::Receiver<LifecycleSignal>,
    origin: Instant,
    paused: bool,
    /// Bumped on every continuity break; captures from older epochs are stale
    epoch: u64,
    skipped_scans: u64,
}

impl<S: FrameSource> ScanScheduler<S> {
    pub fn new(pipeline: FatiguePipeline<S>) -> (Self, ScanHandle) {
        let (tx, signals) = mpsc::channel(16);
        let scheduler = Self {
            pipeline,
            signals,
            origin: Instant::now(),
            paused: false,
            epoch: 0,
            skipped_scans: 0,
        };
        (scheduler, ScanHandle { tx })
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn break_continuity(&mut self) {
        self.epoch += 1;
        self.pipeline.reset_continuity();
    }

    /// Run until `Stop` (or every handle is dropped), then emit the session summary
    pub async fn run(mut self) -> ScanReport {
        let (captured_tx, mut captured_rx) = mpsc::channel::<Captured>(1);
        let session_id = self.pipeline.start_session(self.now_ms());
        info!(%session_id, "Starting scan loop");

        let next_scan = sleep_until(Instant::now() + self.pipeline.scan_interval());
        tokio::pin!(next_scan);

        loop {
            tokio::select! {
                _ = &mut next_scan => {
                    if !self.paused {
                        self.schedule_capture(&captured_tx);
                    }
                    next_scan
                        .as_mut()
                        .reset(Instant::now() + self.pipeline.scan_interval());
                }
                Some((epoch, captured)) = captured_rx.recv() => {
                    if epoch != self.epoch || self.paused {
                        debug!(epoch, current = self.epoch, "Discarding stale capture");
                        continue;
                    }
                    let now = self.now_ms();
                    self.pipeline.on_capture(captured, now);
                }
                signal = self.signals.recv() => match signal {
                    Some(LifecycleSignal::Background) => {
                        info!("Backgrounded, pausing scans");
                        self.paused = true;
                        self.break_continuity();
                    }
                    Some(LifecycleSignal::Foreground) => {
                        info!("Foregrounded, resuming scans");
                        self.paused = false;
                        self.break_continuity();
                    }
                    Some(LifecycleSignal::Reset) => self.break_continuity(),
                    Some(LifecycleSignal::Stop) | None => break,
                },
            }
        }

        // Read the running counters before the session is closed
        let quality = self.pipeline.quality();
        let alerts_fired = self.pipeline.alerts_fired();
        let summary = self.pipeline.end_session(self.now_ms());
        info!(skipped = self.skipped_scans, "Scan loop stopped");
        ScanReport {
            summary,
            quality,
            skipped_scans: self.skipped_scans,
            failed_frames: self.pipeline.failed_frames(),
            alerts_fired,
        }
    }

    fn schedule_capture(&mut self, captured_tx: &mpsc::Sender<Captured>) {
        let Some(permit) = self.pipeline.guard().try_begin() else {
            self.skipped_scans += 1;
            debug!("Previous capture still in flight, skipping scan");
            return;
        };

        let source = self.pipeline.source();
        let tx = captured_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let captured = source.capture().await;
            if tx.send((epoch, captured)).await.is_err() {
                warn!("Scan loop gone before capture completed");
            }
            drop(permit);
        });
    }
}
