//! Fatigue Telemetry API Server
//!
//! Ingests window logs and session summaries from monitoring clients,
//! validates them at the boundary and serves them back for inspection.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use storage::{Repository, StorageError};
use telemetry::TelemetryConfig;
use thiserror::Error;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod demo;
pub mod rate_limit;
pub mod routes;
pub mod settings;

pub use demo::spawn_demo;
pub use rate_limit::{create_governor_config, IngestGovernorConfig, RateLimitConfig};
pub use settings::{AppConfig, DemoConfig, ServerConfig};

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Storage(StorageError::Validation(_)) => {
                warn!(error = %self, "Rejected record");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => {
                error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub repository: Arc<Repository>,
    /// Window logs below this confidence are acknowledged but not stored
    pub drop_confidence_below: f64,
    /// Renders `/metrics`; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(repository: Arc<Repository>, telemetry: &TelemetryConfig) -> Self {
        Self {
            repository,
            drop_confidence_below: telemetry.drop_confidence_below,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StorageStats,
}

#[derive(Debug, Serialize)]
pub struct StorageStats {
    pub window_log_count: usize,
    pub session_count: usize,
}

/// Create the application router.
///
/// With `rate_limit` set, the ingestion routes are limited per peer IP.
pub fn create_router(
    state: Arc<AppState>,
    rate_limit: Option<Arc<IngestGovernorConfig>>,
) -> Router {
    let mut ingest = Router::new()
        .route("/api/v1/fatigue/window", post(routes::windows::ingest_window))
        .route("/api/v1/fatigue/session", post(routes::sessions::ingest_session));
    if let Some(config) = rate_limit {
        ingest = ingest.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/fatigue/windows", get(routes::windows::list_windows))
        .route("/api/v1/fatigue/sessions", get(routes::sessions::list_sessions))
        .route("/api/v1/fatigue/logs", axum::routing::delete(routes::clear_logs))
        .route("/metrics", get(metrics_handler))
        .merge(ingest)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage: StorageStats {
            window_log_count: state.repository.window_log_count(),
            session_count: state.repository.session_count(),
        },
    })
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &ServerConfig) -> Result<(), ApiError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Serve `app` until ctrl-c
pub async fn run_server(addr: &str, app: Router) -> Result<(), ApiError> {
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    const SESSION: &str = "3f2b8c1e-9a4d-4c6e-8f1a-2b3c4d5e6f70";

    fn app_with(rate_limit: Option<RateLimitConfig>) -> (Router, Arc<Repository>) {
        let repo = Arc::new(Repository::new());
        let state = Arc::new(AppState::new(repo.clone(), &TelemetryConfig::default()));
        let governor = rate_limit.map(|c| create_governor_config(&c).unwrap());
        (create_router(state, governor), repo)
    }

    fn app() -> (Router, Arc<Repository>) {
        app_with(None)
    }

    async fn request(
        app: &Router,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(path);
        let mut req = match body {
            Some(payload) => builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            json!({})
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}))
        };
        (status, json)
    }

    const WINDOW_ROUTE: &str = "/api/v1/fatigue/window";
    const SESSION_ROUTE: &str = "/api/v1/fatigue/session";

    async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        request(app, Method::POST, path, Some(body)).await
    }

    fn window_log(timestamp: u64, confidence: f64) -> Value {
        json!({
            "schemaVersion": "2.0",
            "sessionId": SESSION,
            "deviceHash": "a".repeat(64),
            "platform": "android",
            "timestamp": timestamp,
            "windowDurationMs": 20000,
            "baselineEAR": 0.28,
            "normalizedEARMean": 0.92,
            "normalizedEARVariance": 0.004,
            "blinkRate": 16.0,
            "blinkEntropy": null,
            "perclos": 0.08,
            "sustainedLowEAR": false,
            "fatigueLevel": "MEDIUM",
            "confidence": confidence,
            "lowConfidence": confidence < 0.6,
            "unstableSignal": false,
            "lowLiveness": false,
            "scanIntervalMs": 1200,
            "faceDetectedRatio": 0.95
        })
    }

    fn session_summary() -> Value {
        json!({
            "schemaVersion": "2.0",
            "sessionId": SESSION,
            "startTime": 1000,
            "endTime": 61000,
            "durationMs": 60000,
            "avgConfidence": 0.82,
            "peakFatigueLevel": "HIGH",
            "fatigueDistribution": {"LOW": 0.5, "MEDIUM": 0.3, "HIGH": 0.2},
            "baselineSuccessful": true,
            "alertCount": 2,
            "frameCount": 10,
            "frameQuality": {
                "totalFrames": 12,
                "faceDetectedFrames": 11,
                "droppedFrames": 1,
                "calibrationFrames": 1,
                "lowConfidenceFrames": 2,
                "validFatigueFrames": 8,
                "highFatigueFrames": 2,
                "avgConfidence": 0.82
            }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = request(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"]["window_log_count"], 0);
    }

    #[tokio::test]
    async fn test_window_ingest_and_list() {
        let (app, repo) = app();
        let (status, ack) = post_json(&app, WINDOW_ROUTE, window_log(1000, 0.8)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(ack["status"], "stored");
        assert_eq!(ack["sessionId"], SESSION);
        post_json(&app, WINDOW_ROUTE, window_log(2000, 0.9)).await;
        assert_eq!(repo.window_log_count(), 2);

        let path = format!("/api/v1/fatigue/windows?session_id={SESSION}&limit=1");
        let (status, body) = request(&app, Method::GET, &path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["timestamp"], 2000);
    }

    #[tokio::test]
    async fn test_low_confidence_window_is_skipped() {
        let (app, repo) = app();
        let (status, ack) = post_json(&app, WINDOW_ROUTE, window_log(1000, 0.3)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "skipped");
        assert_eq!(repo.window_log_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_window_is_rejected() {
        let (app, repo) = app();
        let mut log = window_log(1000, 0.8);
        log["deviceHash"] = json!("raw-device-id");
        let (status, body) = post_json(&app, WINDOW_ROUTE, log).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("deviceHash"));

        let mut log = window_log(1000, 0.8);
        log["schemaVersion"] = json!("1.0");
        let (status, _) = post_json(&app, WINDOW_ROUTE, log).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(repo.window_log_count(), 0);
    }

    #[tokio::test]
    async fn test_session_ingest_and_clear() {
        let (app, repo) = app();
        let (status, _) = post_json(&app, SESSION_ROUTE, session_summary()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = request(&app, Method::GET, "/api/v1/fatigue/sessions", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["peakFatigueLevel"], "HIGH");

        let mut broken = session_summary();
        broken["fatigueDistribution"]["HIGH"] = json!(0.6);
        let (status, _) = post_json(&app, SESSION_ROUTE, broken).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        // Quality counters must agree with frameCount
        let mut miscounted = session_summary();
        miscounted["frameQuality"]["validFatigueFrames"] = json!(7);
        let (status, _) = post_json(&app, SESSION_ROUTE, miscounted).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(repo.session_count(), 1);

        let (status, _) = request(&app, Method::DELETE, "/api/v1/fatigue/logs", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(repo.session_count(), 0);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (app, _) = app();
        let (status, _) = request(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ingest_is_rate_limited() {
        let (app, _) = app_with(Some(RateLimitConfig {
            per_second: 60,
            burst_size: 2,
        }));
        for ts in [1000, 2000] {
            let (status, _) = post_json(&app, WINDOW_ROUTE, window_log(ts, 0.8)).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let (status, _) = post_json(&app, WINDOW_ROUTE, window_log(3000, 0.8)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        // Inspection routes are not limited
        let (status, _) = request(&app, Method::GET, "/api/v1/fatigue/windows", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
