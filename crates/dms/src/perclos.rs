//! PERCLOS (percentage of eyelid closure)

use frame_buffer::TimeWindow;

use crate::config::PerclosConfig;

/// Share of frames in a trailing window whose EAR sits below the closure threshold
#[derive(Debug, Clone)]
pub struct PerclosTracker {
    closure_threshold: f64,
    min_frames: usize,
    frames: TimeWindow<bool>,
    current: f64,
}

impl PerclosTracker {
    pub fn new(config: &PerclosConfig) -> Self {
        Self {
            closure_threshold: config.closure_threshold,
            min_frames: config.min_frames,
            frames: TimeWindow::new(config.window_ms),
            current: 0.0,
        }
    }

    /// Record a frame and return the updated ratio (0.0 - 1.0).
    ///
    /// Reports 0 until the window holds `min_frames` frames.
    pub fn update(&mut self, avg_ear: f64, now_ms: u64) -> f64 {
        self.frames.push(now_ms, avg_ear < self.closure_threshold);

        self.current = if self.frames.len() >= self.min_frames {
            let closed = self.frames.values().filter(|&&closed| closed).count();
            closed as f64 / self.frames.len() as f64
        } else {
            0.0
        };
        self.current
    }

    /// Latest ratio
    pub fn perclos(&self) -> f64 {
        self.current
    }

    /// Frames currently in the window
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.current = 0.0;
    }
}
