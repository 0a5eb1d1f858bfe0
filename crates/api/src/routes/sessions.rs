//! Session Summary Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use storage::SessionSummary;
use tracing::info;

use super::{default_limit, IngestAck, IngestStatus, ListResponse, MAX_LIMIT};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Validate and store a finished session's summary
pub async fn ingest_session(
    State(state): State<Arc<AppState>>,
    Json(summary): Json<SessionSummary>,
) -> Result<(StatusCode, Json<IngestAck>), ApiError> {
    let session_id = summary.session_id;
    let peak = summary.peak_fatigue_level;
    state.repository.insert_session_summary(summary)?;
    metrics::counter!("fatigue_session_summaries_ingested_total").increment(1);
    info!(%session_id, %peak, "Session summary ingested");

    let ack = IngestAck {
        status: IngestStatus::Stored,
        session_id,
    };
    Ok((StatusCode::CREATED, Json(ack)))
}

/// Most recent session summaries first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionQuery>,
) -> Result<Json<ListResponse<SessionSummary>>, ApiError> {
    let limit = params.limit.min(MAX_LIMIT);
    let data: Vec<_> = state
        .repository
        .session_summaries()?
        .into_iter()
        .rev()
        .take(limit)
        .collect();
    Ok(Json(ListResponse::new(data)))
}
