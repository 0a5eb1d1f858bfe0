//! Blink detection and blink-rate estimation

use feature_engine::blink_entropy;
use frame_buffer::TimeWindow;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::BlinkConfig;

/// Physiological floor for reported blink rate (blinks/min)
pub const MIN_BLINK_RATE: f64 = 5.0;
/// Physiological ceiling for reported blink rate (blinks/min)
pub const MAX_BLINK_RATE: f64 = 60.0;

/// A registered blink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkEvent {
    pub timestamp_ms: u64,
}

/// Frame-counting blink detector.
///
/// A closed run only counts as a blink if its length lies in
/// `[min_frames, max_frames]`. Shorter runs are noise; longer runs are
/// sustained closures and left to PERCLOS and the fatigue score.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    min_frames: u32,
    max_frames: u32,
    closed_frames: u32,
    total_blinks: u64,
}

impl BlinkDetector {
    pub fn new(config: &BlinkConfig) -> Self {
        Self {
            threshold: config.threshold,
            min_frames: config.min_frames,
            max_frames: config.max_frames,
            closed_frames: 0,
            total_blinks: 0,
        }
    }

    /// Feed one frame's average EAR; returns true if a blink completed on this frame
    pub fn update(&mut self, avg_ear: f64) -> bool {
        if avg_ear < self.threshold {
            self.closed_frames = self.closed_frames.saturating_add(1);
            return false;
        }

        let run = self.closed_frames;
        self.closed_frames = 0;

        if run >= self.min_frames && run <= self.max_frames {
            self.total_blinks += 1;
            trace!(run, total = self.total_blinks, "Blink registered");
            return true;
        }
        false
    }

    /// Length of the current closed run
    pub fn closed_frames(&self) -> u32 {
        self.closed_frames
    }

    /// Eyes have stayed closed longer than any blink
    pub fn is_sustained_closure(&self) -> bool {
        self.closed_frames > self.max_frames
    }

    /// Blinks detected since the last reset
    pub fn total_blinks(&self) -> u64 {
        self.total_blinks
    }

    /// Clear counters (call whenever calibration restarts)
    pub fn reset(&mut self) {
        self.closed_frames = 0;
        self.total_blinks = 0;
    }
}

/// Sliding-time-window blink rate
#[derive(Debug, Clone)]
pub struct BlinkWindow {
    events: TimeWindow<BlinkEvent>,
}

impl BlinkWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            events: TimeWindow::new(window_ms),
        }
    }

    /// Record a blink and purge events older than the window
    pub fn add_blink(&mut self, timestamp_ms: u64) {
        self.events.push(timestamp_ms, BlinkEvent { timestamp_ms });
    }

    /// Blinks per minute over the window, clamped to the physiological range
    pub fn blink_rate(&mut self, now_ms: u64) -> f64 {
        self.events.purge(now_ms);
        let window_ms = self.events.window_ms().max(1) as f64;
        let rate = self.events.len() as f64 * 60_000.0 / window_ms;
        rate.clamp(MIN_BLINK_RATE, MAX_BLINK_RATE)
    }

    /// Inter-blink entropy over the retained events
    pub fn entropy(&self, bin_ms: u64) -> Option<f64> {
        blink_entropy(&self.events.timestamps(), bin_ms)
    }

    /// Events currently inside the window
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear the event buffer
    pub fn reset(&mut self) {
        self.events.clear();
    }
}
