//! Indexing history sessions and admin notifications
//!
//! A history session lives in memory for one indexing run. Completing it
//! optionally flushes its records to the store.

mod notify;

pub use notify::*;

use crate::error::{Error, Result};
use crate::store::{HistoryRecord, SiteStatus, Store};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub struct HistorySink {
    store: Store,
    sessions: DashMap<Uuid, Vec<HistoryRecord>>,
}

impl HistorySink {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
        }
    }

    /// Open an empty session
    pub fn start_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, Vec::new());
        debug!("Started history session {}", id);
        id
    }

    /// Append one record to an open session
    pub fn append(&self, session_id: Uuid, url: &str, status: SiteStatus) -> Result<HistoryRecord> {
        let mut records = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        let record = HistoryRecord::new(session_id, url, status);
        records.push(record.clone());
        Ok(record)
    }

    /// Snapshot of an open session's records
    pub fn read(&self, session_id: Uuid) -> Result<Vec<HistoryRecord>> {
        self.sessions
            .get(&session_id)
            .map(|records| records.clone())
            .ok_or_else(|| unknown_session(session_id))
    }

    /// Close a session, writing its records to the store when `persist` is set
    pub async fn complete(&self, session_id: Uuid, persist: bool) -> Result<Vec<HistoryRecord>> {
        let (_, records) = self
            .sessions
            .remove(&session_id)
            .ok_or_else(|| unknown_session(session_id))?;

        if persist && !records.is_empty() {
            self.store.insert_history(&records).await?;
            info!(
                "Persisted {} history records for session {}",
                records.len(),
                session_id
            );
        }
        Ok(records)
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

fn unknown_session(id: Uuid) -> Error {
    Error::NotFound(format!("History session {} is not open", id))
}
