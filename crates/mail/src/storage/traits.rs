//! Storage trait definitions

use crate::models::{Folder, Message, MessageId};
use anyhow::Result;

/// Trait for mail storage operations
///
/// Stores hand out fully materialized messages: there is no partial or
/// incremental fetch. Unknown folders and messages are reported as errors
/// by the listing and move operations, and as `None` by the lookups.
pub trait MailStore: Send + Sync {
    /// List all folders with their message and unread counts
    fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Get a folder by path
    fn get_folder(&self, path: &str) -> Result<Option<Folder>>;

    /// Insert a folder if it does not exist yet
    fn upsert_folder(&self, folder: Folder) -> Result<()>;

    /// Insert or update a message. Its folder is created if missing.
    fn upsert_message(&self, message: Message) -> Result<()>;

    /// List every message in one folder, newest first
    fn list_messages(&self, folder_path: &str) -> Result<Vec<Message>>;

    /// List every message across all folders, folder by folder
    fn list_all_messages(&self) -> Result<Vec<Message>>;

    /// Get a message by ID
    fn get_message(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Move a message to another existing folder
    fn move_message(&self, id: &MessageId, target_folder: &str) -> Result<()>;

    /// Count messages across all folders
    fn count_messages(&self) -> Result<usize>;

    /// Clear all data (for testing)
    fn clear(&self) -> Result<()>;
}
