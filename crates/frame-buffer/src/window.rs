//! Time-based sliding window

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sample tagged with its capture time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub timestamp_ms: u64,
    pub value: T,
}

/// FIFO of samples covering a trailing duration.
///
/// The window is measured in time rather than sample count so that rates stay
/// correct when the frame interval varies.
#[derive(Debug, Clone)]
pub struct TimeWindow<T> {
    samples: VecDeque<Timestamped<T>>,
    window_ms: u64,
}

impl<T> TimeWindow<T> {
    /// Create a window spanning `window_ms`
    pub fn new(window_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_ms,
        }
    }

    /// Append a sample and purge anything that fell out of the window
    pub fn push(&mut self, timestamp_ms: u64, value: T) {
        self.samples.push_back(Timestamped {
            timestamp_ms,
            value,
        });
        self.purge(timestamp_ms);
    }

    /// Drop samples older than the window, oldest first.
    ///
    /// A sample exactly `window_ms` old is still inside the window.
    pub fn purge(&mut self, now_ms: u64) {
        while let Some(front) = self.samples.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > self.window_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Iterate samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Timestamped<T>> {
        self.samples.iter()
    }

    /// Iterate sample values oldest first
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.samples.iter().map(|s| &s.value)
    }

    /// Timestamps oldest first
    pub fn timestamps(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.timestamp_ms).collect()
    }

    /// Oldest retained sample
    pub fn front(&self) -> Option<&Timestamped<T>> {
        self.samples.front()
    }

    /// Get the number of samples currently in the window
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window length in milliseconds
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Clear the window
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_purge_oldest_first() {
        let mut window = TimeWindow::new(1000);
        window.push(0, 'a');
        window.push(500, 'b');
        window.push(1000, 'c');
        assert_eq!(window.len(), 3);

        window.push(1200, 'd');
        let values: Vec<_> = window.values().copied().collect();
        assert_eq!(values, vec!['b', 'c', 'd']);
    }

    #[test]
    fn test_purge_without_push() {
        let mut window = TimeWindow::new(1000);
        window.push(0, 1);
        window.push(100, 2);

        window.purge(5000);
        assert!(window.is_empty());
    }

    proptest! {
        #[test]
        fn prop_window_never_holds_stale_samples(
            steps in proptest::collection::vec(0u64..400, 1..200)
        ) {
            let mut window = TimeWindow::new(2000);
            let mut now = 0u64;
            for step in steps {
                now += step;
                window.push(now, ());
                for sample in window.iter() {
                    prop_assert!(now - sample.timestamp_ms <= 2000);
                }
            }
        }
    }
}
