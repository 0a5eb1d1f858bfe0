//! Alert output capability

use std::sync::Mutex;

use dms::FatigueLevel;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AlertError;

/// Distinguishable feedback pattern per fatigue level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPattern {
    /// Single 400 ms pulse
    Short,
    /// Wait / pulse / wait / pulse: [0, 800, 200, 800] ms
    Long,
}

impl AlertPattern {
    pub fn for_level(level: FatigueLevel) -> Self {
        match level {
            FatigueLevel::High => AlertPattern::Long,
            _ => AlertPattern::Short,
        }
    }

    /// Alternating off/on durations in milliseconds
    pub fn timings_ms(&self) -> &'static [u64] {
        match self {
            AlertPattern::Short => &[400],
            AlertPattern::Long => &[0, 800, 200, 800],
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.timings_ms().iter().sum()
    }
}

/// Something that can play an alert pattern (vibration motor, speaker, ...)
pub trait AlertSink: Send + Sync {
    fn play(&self, pattern: AlertPattern) -> Result<(), AlertError>;
}

/// Sink that only records the alert in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn play(&self, pattern: AlertPattern) -> Result<(), AlertError> {
        info!(?pattern, timings_ms = ?pattern.timings_ms(), "Alert played");
        Ok(())
    }
}

/// Sink that keeps every played pattern in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    played: Mutex<Vec<AlertPattern>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<AlertPattern> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

impl AlertSink for MemoryAlertSink {
    fn play(&self, pattern: AlertPattern) -> Result<(), AlertError> {
        self.played
            .lock()
            .map_err(|_| AlertError::Unavailable("alert recorder poisoned".into()))?
            .push(pattern);
        Ok(())
    }
}
