//! Per-run crawl context
//!
//! A [`CrawlSession`] owns everything one crawl run mutates: its lifecycle
//! state, the visited and discovered URL sets, and the cancellation token
//! observed by every fetch task of the run. Sessions are handed to tasks by
//! `Arc`, so two runs never share state.

use crate::error::{Error, Result};
use dashmap::DashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Lifecycle of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl CrawlState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CrawlState::Completed | CrawlState::Failed | CrawlState::Stopped
        )
    }
}

impl std::fmt::Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlState::Idle => write!(f, "idle"),
            CrawlState::Running => write!(f, "running"),
            CrawlState::Completed => write!(f, "completed"),
            CrawlState::Failed => write!(f, "failed"),
            CrawlState::Stopped => write!(f, "stopped"),
        }
    }
}

pub struct CrawlSession {
    id: Uuid,
    seed: String,
    state: Mutex<CrawlState>,
    cancel: Mutex<CancellationToken>,
    visited: DashSet<String>,
    discovered: DashSet<String>,
}

impl CrawlSession {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed: seed.into(),
            state: Mutex::new(CrawlState::Idle),
            cancel: Mutex::new(CancellationToken::new()),
            visited: DashSet::new(),
            discovered: DashSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn state(&self) -> CrawlState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == CrawlState::Running
    }

    /// IDLE (or a finished state) -> RUNNING, clearing all per-run sets.
    ///
    /// Reusing a finished session also replaces its token; a cancel issued
    /// to a session that never ran stays in force.
    pub fn begin(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == CrawlState::Running {
            return Err(Error::State(format!(
                "Crawl of {} is already running",
                self.seed
            )));
        }
        self.visited.clear();
        self.discovered.clear();
        if state.is_terminal() {
            *self.cancel.lock() = CancellationToken::new();
        }
        *state = CrawlState::Running;
        Ok(())
    }

    /// Request cancellation of a running crawl
    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::State("Indexing is not running".to_string()));
        }
        self.cancel();
        Ok(())
    }

    /// Cancel whatever phase the owning run is in
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.lock().is_cancelled()
    }

    /// Token observed by fetch tasks of the current run
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// Move to a terminal state. A cancelled run always ends as STOPPED
    /// unless it already failed.
    pub fn finish(&self, outcome: CrawlState) -> CrawlState {
        let mut state = self.state.lock();
        let final_state = if outcome != CrawlState::Failed && self.is_stopped() {
            CrawlState::Stopped
        } else {
            outcome
        };
        *state = final_state;
        final_state
    }

    /// Record a URL as visited; false if it already was
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Record a discovered link; false if already known
    pub fn add_discovered(&self, url: &str) -> bool {
        self.discovered.insert(url.to_string())
    }

    pub fn discovered(&self) -> Vec<String> {
        let mut links: Vec<String> = self.discovered.iter().map(|u| u.key().clone()).collect();
        links.sort();
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let session = CrawlSession::new("https://example.com/");
        assert_eq!(session.state(), CrawlState::Idle);

        session.begin().unwrap();
        assert!(session.is_running());
        assert!(session.begin().is_err());

        assert_eq!(session.finish(CrawlState::Completed), CrawlState::Completed);
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_stop_requires_running() {
        let session = CrawlSession::new("https://example.com/");
        assert!(matches!(session.stop(), Err(Error::State(_))));

        session.begin().unwrap();
        session.stop().unwrap();
        assert!(session.cancel_token().is_cancelled());
        assert_eq!(session.finish(CrawlState::Completed), CrawlState::Stopped);
    }

    #[test]
    fn test_failed_wins_over_stop() {
        let session = CrawlSession::new("https://example.com/");
        session.begin().unwrap();
        session.stop().unwrap();
        assert_eq!(session.finish(CrawlState::Failed), CrawlState::Failed);
    }

    #[test]
    fn test_begin_resets_sets_and_token() {
        let session = CrawlSession::new("https://example.com/");
        session.begin().unwrap();
        assert!(session.mark_visited("https://example.com/a"));
        assert!(!session.mark_visited("https://example.com/a"));
        session.add_discovered("https://example.com/b");
        session.stop().unwrap();
        session.finish(CrawlState::Completed);

        session.begin().unwrap();
        assert_eq!(session.visited_count(), 0);
        assert!(session.discovered().is_empty());
        assert!(!session.is_stopped());
    }

    #[test]
    fn test_cancel_before_begin_is_kept() {
        let session = CrawlSession::new("https://example.com/");
        session.cancel();
        session.begin().unwrap();
        assert!(session.is_stopped());
        assert_eq!(session.finish(CrawlState::Completed), CrawlState::Stopped);
    }
}
