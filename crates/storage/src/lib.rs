//! Storage Layer
//!
//! Schema-versioned telemetry records, validated at the serialization
//! boundary, and an in-memory append-only repository.

mod records;
mod repository;

pub use records::{
    DataQualitySnapshot, LevelDistribution, SessionSummary, WindowLog, SESSION_SUMMARY_SCHEMA,
    WINDOW_LOG_SCHEMA,
};
pub use repository::{Repository, RepositorySnapshot, StorageSink};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Repository lock poisoned: {0}")]
    Lock(String),
    #[error("Invalid record: {0}")]
    Validation(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
