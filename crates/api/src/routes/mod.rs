//! HTTP route handlers

pub mod sessions;
pub mod windows;

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{ApiError, AppState};

/// Maximum records returned by a list route
pub const MAX_LIMIT: usize = 1000;

fn default_limit() -> usize {
    100
}

/// Outcome of an ingestion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Stored,
    /// Accepted but not kept (confidence below the drop threshold)
    Skipped,
}

/// Acknowledgement for an ingested record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub status: IngestStatus,
    pub session_id: Uuid,
}

/// List response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResponse<T> {
    fn new(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// Drop every stored window log and session summary
pub async fn clear_logs(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.repository.clear_logs()?;
    info!("Telemetry logs cleared via API");
    Ok(StatusCode::NO_CONTENT)
}
