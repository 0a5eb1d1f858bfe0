//! Fatigue Monitor - Main Entry Point

use anyhow::Context;
use api::{
    create_governor_config, create_router, init_logging, run_server, spawn_demo, AppConfig,
    AppState,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use storage::Repository;
use tracing::{info, warn};

/// Config file stem; `config` tries every supported extension
const DEFAULT_CONFIG: &str = "fatigue-monitor";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("FATIGUE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;

    init_logging(&config.server)?;
    info!("=== Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    let repository = Arc::new(Repository::new());
    let state = Arc::new(
        AppState::new(repository.clone(), &config.telemetry).with_metrics(prometheus),
    );
    let governor = create_governor_config(&config.rate_limit)?;

    let demo = if config.demo.enabled {
        Some(spawn_demo(&config, repository).context("starting demo session")?)
    } else {
        None
    };

    run_server(&config.server.bind_addr, create_router(state, Some(governor))).await?;

    if let Some(demo) = demo {
        if !demo.is_finished() {
            warn!("Server stopped before the demo session finished");
        }
        demo.abort();
    }
    Ok(())
}
