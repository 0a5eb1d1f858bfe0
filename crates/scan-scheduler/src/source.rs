//! Frame sources

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use feature_engine::LandmarkFrame;
use frame_buffer::LatestSlot;
use tokio::time::Instant;
use tracing::trace;

use crate::CaptureError;

/// Something that produces landmark frames on request.
///
/// `Ok(None)` means the frame was captured but no face was found.
pub trait FrameSource: Send + Sync + 'static {
    fn capture(&self) -> impl Future<Output = Result<Option<LandmarkFrame>, CaptureError>> + Send;
}

/// Reads the newest detector output from a single-slot handoff buffer.
///
/// The producer (camera callback, worker thread) writes into [`SlotFrameSource::slot`];
/// stale frames are overwritten, never queued.
#[derive(Debug, Clone, Default)]
pub struct SlotFrameSource {
    slot: Arc<LatestSlot<Option<LandmarkFrame>>>,
}

impl SlotFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the producer side
    pub fn slot(&self) -> Arc<LatestSlot<Option<LandmarkFrame>>> {
        Arc::clone(&self.slot)
    }
}

impl FrameSource for SlotFrameSource {
    async fn capture(&self) -> Result<Option<LandmarkFrame>, CaptureError> {
        self.slot.take().ok_or(CaptureError::NoFrame)
    }
}

/// One scripted stretch of a synthetic session
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub duration_ms: u64,
    /// Eye aspect ratio while the eyes are open
    pub ear: f64,
    pub face: bool,
    /// Blink period; each blink closes the eyes for `BLINK_MS`
    pub blink_every_ms: Option<u64>,
}

impl Segment {
    const BLINK_MS: u64 = 150;
    const CLOSED_EAR: f64 = 0.08;

    pub fn open(duration_ms: u64, ear: f64) -> Self {
        Self {
            duration_ms,
            ear,
            face: true,
            blink_every_ms: None,
        }
    }

    pub fn no_face(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ear: 0.0,
            face: false,
            blink_every_ms: None,
        }
    }

    pub fn with_blinks(mut self, every_ms: u64) -> Self {
        self.blink_every_ms = Some(every_ms.max(Self::BLINK_MS + 1));
        self
    }

    fn ear_at(&self, offset_ms: u64) -> f64 {
        match self.blink_every_ms {
            Some(period) if offset_ms % period < Self::BLINK_MS => Self::CLOSED_EAR,
            _ => self.ear,
        }
    }
}

/// Scripted landmark frames for demos and tests.
///
/// The script is laid out on the tokio clock from construction time; the last
/// segment repeats once the script runs out.
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    segments: Vec<Segment>,
    origin: Instant,
    latency: Duration,
    width: u32,
    height: u32,
}

impl SyntheticFrameSource {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            origin: Instant::now(),
            latency: Duration::ZERO,
            width: 640,
            height: 480,
        }
    }

    /// Alert subject who becomes drowsy after `alert_ms`
    pub fn drowsy_after(alert_ms: u64) -> Self {
        Self::new(vec![
            Segment::open(alert_ms, 0.30).with_blinks(3700),
            Segment::open(1, 0.10),
        ])
    }

    /// Simulated capture + detection time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn segment_at(&self, elapsed_ms: u64) -> Option<(&Segment, u64)> {
        let mut start = 0u64;
        for segment in &self.segments {
            let end = start.saturating_add(segment.duration_ms);
            if elapsed_ms < end {
                return Some((segment, elapsed_ms - start));
            }
            start = end;
        }
        self.segments
            .last()
            .map(|last| (last, elapsed_ms.saturating_sub(start)))
    }

    /// Frame the script shows at `elapsed_ms`
    pub fn frame_at(&self, elapsed_ms: u64) -> Result<Option<LandmarkFrame>, CaptureError> {
        let (segment, offset) = self
            .segment_at(elapsed_ms)
            .ok_or_else(|| CaptureError::Device("empty synthetic script".into()))?;
        if !segment.face {
            return Ok(None);
        }
        let ear = segment.ear_at(offset);
        Ok(Some(LandmarkFrame::synthetic(
            ear,
            ear,
            10.0,
            0.0,
            self.width,
            self.height,
        )))
    }
}

impl FrameSource for SyntheticFrameSource {
    async fn capture(&self) -> Result<Option<LandmarkFrame>, CaptureError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let elapsed_ms = self.origin.elapsed().as_millis() as u64;
        trace!(elapsed_ms, "Synthetic capture");
        self.frame_at(elapsed_ms)
    }
}
