//! Layered service configuration

use alerting::AlertConfig;
use dms::DmsConfig;
use scan_scheduler::ScanConfig;
use serde::{Deserialize, Serialize};
use telemetry::TelemetryConfig;

use crate::rate_limit::RateLimitConfig;

/// Environment variable prefix; nested keys use `__`, e.g. `FATIGUE__SERVER__BIND_ADDR`
pub const ENV_PREFIX: &str = "FATIGUE";

/// HTTP listener and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Synthetic scan session run next to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
    /// Eyes stay open this long before the synthetic subject turns drowsy
    pub drowsy_after_ms: u64,
    /// Session length; the scan loop is stopped afterwards
    pub duration_secs: u64,
    pub device_id: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            drowsy_after_ms: 30_000,
            duration_secs: 120,
            device_id: "demo-device".to_string(),
        }
    }
}

/// Everything the binary reads at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub telemetry: TelemetryConfig,
    pub scan: ScanConfig,
    pub demo: DemoConfig,
}

impl AppConfig {
    /// Built-in defaults, then the optional file at `path`, then `FATIGUE__*` variables
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
