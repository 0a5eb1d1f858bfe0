//! Window Log Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use storage::WindowLog;
use tracing::debug;
use uuid::Uuid;

use super::{default_limit, IngestAck, IngestStatus, ListResponse, MAX_LIMIT};
use crate::{ApiError, AppState};

/// Query parameters for the window log listing
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Only logs from this session
    pub session_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Validate and store one window log
pub async fn ingest_window(
    State(state): State<Arc<AppState>>,
    Json(log): Json<WindowLog>,
) -> Result<(StatusCode, Json<IngestAck>), ApiError> {
    log.validate()?;
    let session_id = log.session_id;

    if log.confidence < state.drop_confidence_below {
        debug!(
            %session_id,
            confidence = log.confidence,
            "Window log below drop threshold, skipped"
        );
        metrics::counter!("fatigue_window_logs_skipped_total").increment(1);
        let ack = IngestAck {
            status: IngestStatus::Skipped,
            session_id,
        };
        return Ok((StatusCode::OK, Json(ack)));
    }

    state.repository.insert_window_log(log)?;
    metrics::counter!("fatigue_window_logs_ingested_total").increment(1);
    let ack = IngestAck {
        status: IngestStatus::Stored,
        session_id,
    };
    Ok((StatusCode::CREATED, Json(ack)))
}

/// Most recent window logs first
pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<ListResponse<WindowLog>>, ApiError> {
    let limit = params.limit.min(MAX_LIMIT);
    let data = state
        .repository
        .recent_window_logs(params.session_id, limit)?;
    Ok(Json(ListResponse::new(data)))
}
