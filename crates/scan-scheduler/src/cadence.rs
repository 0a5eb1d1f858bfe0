//! Adaptive scan cadence

use dms::FatigueLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scan interval per fatigue level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interval at LOW or before any level is known (milliseconds)
    pub low_interval_ms: u64,
    pub medium_interval_ms: u64,
    pub high_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            low_interval_ms: 2000,
            medium_interval_ms: 1200,
            high_interval_ms: 800,
        }
    }
}

impl ScanConfig {
    /// Same interval at every level
    pub fn fixed(interval_ms: u64) -> Self {
        Self {
            low_interval_ms: interval_ms,
            medium_interval_ms: interval_ms,
            high_interval_ms: interval_ms,
        }
    }

    /// Interval for the current level; worse fatigue scans faster
    pub fn interval_ms(&self, level: Option<FatigueLevel>) -> u64 {
        match level {
            Some(FatigueLevel::High) => self.high_interval_ms,
            Some(FatigueLevel::Medium) => self.medium_interval_ms,
            Some(FatigueLevel::Low) | None => self.low_interval_ms,
        }
    }

    pub fn interval(&self, level: Option<FatigueLevel>) -> Duration {
        Duration::from_millis(self.interval_ms(level).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_shortens_with_fatigue() {
        let config = ScanConfig::default();
        assert_eq!(config.interval_ms(None), 2000);
        assert_eq!(config.interval_ms(Some(FatigueLevel::Low)), 2000);
        assert_eq!(config.interval_ms(Some(FatigueLevel::Medium)), 1200);
        assert_eq!(config.interval_ms(Some(FatigueLevel::High)), 800);
    }

    #[test]
    fn test_zero_interval_is_bounded() {
        assert_eq!(ScanConfig::fixed(0).interval(None), Duration::from_millis(1));
    }
}
