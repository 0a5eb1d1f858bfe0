//! Telemetry configuration

use serde::{Deserialize, Serialize};

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Results below this confidence are not logged at all
    pub drop_confidence_below: f64,
    /// Logged results below this confidence carry `lowConfidence = true`
    pub flag_confidence_below: f64,
    /// Blink entropy (bits) below this marks low liveness
    pub low_liveness_entropy: f64,
    /// Aggregation window for EAR statistics and face ratio (milliseconds)
    pub window_ms: u64,
    /// Platform tag written into every window log
    pub platform: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            drop_confidence_below: 0.4,
            flag_confidence_below: 0.6,
            low_liveness_entropy: 0.9,
            window_ms: 20_000,
            platform: std::env::consts::OS.to_string(),
        }
    }
}
