//! Folder model

use serde::{Deserialize, Serialize};

/// A mail folder as reported by a mail store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Full path (e.g., "Inbox", "Custom/Projects")
    pub path: String,
    /// Display name
    pub name: String,
    /// Number of messages in the folder
    pub message_count: usize,
    /// Number of unread messages
    pub unread_count: usize,
}

impl Folder {
    /// Create an empty folder; the display name is the last path segment
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            path,
            name,
            message_count: 0,
            unread_count: 0,
        }
    }

    /// Nesting depth, 0 for top-level folders
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Parent folder path, if nested
    pub fn parent(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(parent, _)| parent)
    }
}
