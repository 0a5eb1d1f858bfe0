//! Single-slot latest-value handoff

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Single-slot buffer holding only the most recent value.
///
/// Writers overwrite whatever is pending; the reader takes the value and
/// leaves the slot empty. Stale frames are dropped instead of queued, so a slow
/// consumer never builds backlog.
#[derive(Debug)]
pub struct LatestSlot<T> {
    /// Pending value
    slot: Mutex<Option<T>>,
    /// Total values written (for statistics)
    total_written: AtomicUsize,
    /// Values overwritten before anyone read them
    overwritten: AtomicUsize,
}

impl<T> LatestSlot<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            total_written: AtomicUsize::new(0),
            overwritten: AtomicUsize::new(0),
        }
    }

    // A panicking writer cannot leave an Option half-written, so poisoning is ignored.
    fn guard(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a value, replacing any unread one
    pub fn write(&self, value: T) {
        let previous = self.guard().replace(value);
        self.total_written.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take the pending value, leaving the slot empty
    pub fn take(&self) -> Option<T> {
        self.guard().take()
    }

    /// Check whether a value is waiting
    pub fn is_pending(&self) -> bool {
        self.guard().is_some()
    }

    /// Drop any pending value
    pub fn clear(&self) {
        self.guard().take();
    }

    /// Get total values written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Get number of values replaced before being read
    pub fn overwritten(&self) -> usize {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
