//! Repository Implementation

use crate::records::{SessionSummary, WindowLog};
use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Append-only sink for telemetry records
pub trait StorageSink: Send + Sync {
    fn store_window_log(&self, record: WindowLog) -> Result<(), StorageError>;
    fn store_session_summary(&self, record: SessionSummary) -> Result<(), StorageError>;
}

/// Serializable dump of the whole repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    pub window_logs: Vec<WindowLog>,
    pub session_summaries: Vec<SessionSummary>,
}

/// Repository for telemetry records (in-memory)
pub struct Repository {
    window_logs: Mutex<VecDeque<WindowLog>>,
    sessions: Mutex<VecDeque<SessionSummary>>,
    max_window_logs: usize,
    max_sessions: usize,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_retention(10_000, 1_000)
    }

    /// Create a repository keeping at most this many records of each kind
    pub fn with_retention(max_window_logs: usize, max_sessions: usize) -> Self {
        info!(max_window_logs, max_sessions, "Creating in-memory repository");
        Self {
            window_logs: Mutex::new(VecDeque::with_capacity(max_window_logs.min(1024))),
            sessions: Mutex::new(VecDeque::with_capacity(max_sessions.min(256))),
            max_window_logs: max_window_logs.max(1),
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
        mutex
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Validate and append a window log
    pub fn insert_window_log(&self, record: WindowLog) -> Result<(), StorageError> {
        record.validate()?;
        let mut logs = Self::lock(&self.window_logs)?;

        // Enforce retention
        while logs.len() >= self.max_window_logs {
            logs.pop_front();
        }
        debug!(session = %record.session_id, level = %record.fatigue_level, "Stored window log");
        logs.push_back(record);
        Ok(())
    }

    /// Validate and append a session summary
    pub fn insert_session_summary(&self, record: SessionSummary) -> Result<(), StorageError> {
        record.validate()?;
        let mut sessions = Self::lock(&self.sessions)?;

        while sessions.len() >= self.max_sessions {
            sessions.pop_front();
        }
        info!(
            session = %record.session_id,
            duration_ms = record.duration_ms,
            peak = %record.peak_fatigue_level,
            "Stored session summary"
        );
        sessions.push_back(record);
        Ok(())
    }

    /// Window logs in insertion order
    pub fn window_logs(&self) -> Result<Vec<WindowLog>, StorageError> {
        Ok(Self::lock(&self.window_logs)?.iter().cloned().collect())
    }

    /// Most recent window logs first, optionally for one session
    pub fn recent_window_logs(
        &self,
        session_id: Option<uuid::Uuid>,
        limit: usize,
    ) -> Result<Vec<WindowLog>, StorageError> {
        let logs = Self::lock(&self.window_logs)?;
        Ok(logs
            .iter()
            .rev()
            .filter(|log| session_id.map_or(true, |id| log.session_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Session summaries in insertion order
    pub fn session_summaries(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(Self::lock(&self.sessions)?.iter().cloned().collect())
    }

    /// Total window log count
    pub fn window_log_count(&self) -> usize {
        self.window_logs.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Total session count
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Drop every stored record
    pub fn clear_logs(&self) -> Result<(), StorageError> {
        Self::lock(&self.window_logs)?.clear();
        Self::lock(&self.sessions)?.clear();
        info!("Cleared telemetry logs");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<RepositorySnapshot, StorageError> {
        Ok(RepositorySnapshot {
            window_logs: self.window_logs()?,
            session_summaries: self.session_summaries()?,
        })
    }

    /// Export everything as JSON
    pub fn export_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(&self.snapshot()?)?)
    }

    /// Append every record of a JSON export; the first invalid record aborts the import
    pub fn import_json(&self, json: &str) -> Result<usize, StorageError> {
        let snapshot: RepositorySnapshot = serde_json::from_str(json)?;
        for log in &snapshot.window_logs {
            log.validate()?;
        }
        for summary in &snapshot.session_summaries {
            summary.validate()?;
        }

        let imported = snapshot.window_logs.len() + snapshot.session_summaries.len();
        for log in snapshot.window_logs {
            self.insert_window_log(log)?;
        }
        for summary in snapshot.session_summaries {
            self.insert_session_summary(summary)?;
        }
        Ok(imported)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageSink for Repository {
    fn store_window_log(&self, record: WindowLog) -> Result<(), StorageError> {
        self.insert_window_log(record)
    }

    fn store_session_summary(&self, record: SessionSummary) -> Result<(), StorageError> {
        self.insert_session_summary(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{session_summary, window_log};
    use uuid::Uuid;

    #[test]
    fn test_window_log_insert_and_retrieve() {
        let repo = Repository::new();
        repo.insert_window_log(window_log(1000)).unwrap();
        repo.insert_window_log(window_log(2000)).unwrap();

        let logs = repo.window_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].timestamp_ms, 1000);

        let recent = repo.recent_window_logs(None, 1).unwrap();
        assert_eq!(recent[0].timestamp_ms, 2000);
    }

    #[test]
    fn test_invalid_record_rejected() {
        let repo = Repository::new();
        let mut log = window_log(0);
        log.perclos = 3.0;

        assert!(matches!(
            repo.insert_window_log(log),
            Err(StorageError::Validation(_))
        ));
        assert_eq!(repo.window_log_count(), 0);
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::with_retention(5, 2);
        for i in 0..10 {
            repo.insert_window_log(window_log(i)).unwrap();
        }
        for i in 0..3 {
            repo.insert_session_summary(session_summary(i, i + 100)).unwrap();
        }

        assert_eq!(repo.window_log_count(), 5);
        assert_eq!(repo.window_logs().unwrap()[0].timestamp_ms, 5);
        assert_eq!(repo.session_count(), 2);
    }

    #[test]
    fn test_filter_by_session() {
        let repo = Repository::new();
        let session = Uuid::new_v4();
        let mut log = window_log(1);
        log.session_id = session;
        repo.insert_window_log(log).unwrap();
        repo.insert_window_log(window_log(2)).unwrap();

        let logs = repo.recent_window_logs(Some(session), 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].timestamp_ms, 1);
    }

    #[test]
    fn test_clear_logs() {
        let repo = Repository::new();
        repo.insert_window_log(window_log(0)).unwrap();
        repo.insert_session_summary(session_summary(0, 1)).unwrap();
        repo.clear_logs().unwrap();

        assert_eq!(repo.window_log_count(), 0);
        assert_eq!(repo.session_count(), 0);
    }

    #[test]
    fn test_export_import() {
        let source = Repository::new();
        source.insert_window_log(window_log(10)).unwrap();
        source.insert_session_summary(session_summary(0, 500)).unwrap();
        let json = source.export_json().unwrap();

        let target = Repository::new();
        assert_eq!(target.import_json(&json).unwrap(), 2);
        assert_eq!(target.snapshot().unwrap(), source.snapshot().unwrap());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let repo = Repository::new();
        assert!(matches!(
            repo.import_json("{not json"),
            Err(StorageError::Serialization(_))
        ));
    }
}
