//! In-memory admin notifications

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Notifications {
    entries: Mutex<Vec<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, message: impl Into<String>) {
        self.entries.lock().push(Notification {
            timestamp: Utc::now().to_rfc3339(),
            message: message.into(),
        });
    }

    /// All notifications, oldest first
    pub fn list(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_list_clear() {
        let notes = Notifications::new();
        notes.notify("first");
        notes.notify(String::from("second"));

        let listed = notes.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].message, "first");

        notes.clear();
        assert!(notes.list().is_empty());
    }
}
