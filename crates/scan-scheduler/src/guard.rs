//! At-most-one-in-flight capture guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared in-progress flag for frame evaluation
#[derive(Debug, Clone, Default)]
pub struct ScanGuard {
    in_flight: Arc<AtomicBool>,
}

impl ScanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if an evaluation is already outstanding
    pub fn try_begin(&self) -> Option<ScanPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held while a capture is outstanding; releases the guard on drop
#[derive(Debug)]
pub struct ScanPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
