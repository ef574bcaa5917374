//! In-memory storage implementation
//!
//! Used by tests and as the demo mailbox for the command binary.

use anyhow::{Result, bail};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::MailStore;
use super::fixture;
use crate::models::{Folder, Message, MessageId};

/// In-memory implementation of MailStore
///
/// Folders keep their insertion order; messages live in a map keyed by ID.
/// Folder counts are derived from the messages whenever folders are listed.
pub struct InMemoryMailStore {
    folders: RwLock<Vec<Folder>>,
    messages: RwLock<HashMap<String, Message>>,
}

impl InMemoryMailStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            folders: RwLock::new(Vec::new()),
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store seeded with the demo mailbox
    pub fn with_fixture() -> Self {
        let store = Self::new();
        {
            let mut folders = store.folders.write().unwrap();
            folders.extend(fixture::demo_folders());
        }
        {
            let mut messages = store.messages.write().unwrap();
            for message in fixture::demo_messages(Utc::now()) {
                messages.insert(message.id.0.clone(), message);
            }
        }
        store
    }

    fn has_folder(&self, path: &str) -> bool {
        self.folders.read().unwrap().iter().any(|f| f.path == path)
    }

    fn with_counts(&self, mut folder: Folder) -> Folder {
        let messages = self.messages.read().unwrap();
        let in_folder = messages.values().filter(|m| m.folder_path == folder.path);
        let (total, unread) = in_folder.fold((0, 0), |(total, unread), m| {
            (total + 1, unread + usize::from(!m.is_read))
        });
        folder.message_count = total;
        folder.unread_count = unread;
        folder
    }
}

impl Default for InMemoryMailStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first, ties broken by ID so listings are deterministic
fn newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        b.received_at
            .cmp(&a.received_at)
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
}

impl MailStore for InMemoryMailStore {
    fn list_folders(&self) -> Result<Vec<Folder>> {
        let folders = self.folders.read().unwrap().clone();
        Ok(folders.into_iter().map(|f| self.with_counts(f)).collect())
    }

    fn get_folder(&self, path: &str) -> Result<Option<Folder>> {
        let folder = self
            .folders
            .read()
            .unwrap()
            .iter()
            .find(|f| f.path == path)
            .cloned();
        Ok(folder.map(|f| self.with_counts(f)))
    }

    fn upsert_folder(&self, folder: Folder) -> Result<()> {
        let mut folders = self.folders.write().unwrap();
        if !folders.iter().any(|f| f.path == folder.path) {
            folders.push(folder);
        }
        Ok(())
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        self.upsert_folder(Folder::new(message.folder_path.clone()))?;
        let mut messages = self.messages.write().unwrap();
        messages.insert(message.id.0.clone(), message);
        Ok(())
    }

    fn list_messages(&self, folder_path: &str) -> Result<Vec<Message>> {
        if !self.has_folder(folder_path) {
            bail!("Folder '{}' not found", folder_path);
        }

        let messages = self.messages.read().unwrap();
        let mut result: Vec<Message> = messages
            .values()
            .filter(|m| m.folder_path == folder_path)
            .cloned()
            .collect();
        newest_first(&mut result);
        Ok(result)
    }

    fn list_all_messages(&self) -> Result<Vec<Message>> {
        let paths: Vec<String> = self
            .folders
            .read()
            .unwrap()
            .iter()
            .map(|f| f.path.clone())
            .collect();

        let mut result = Vec::new();
        for path in paths {
            result.extend(self.list_messages(&path)?);
        }
        Ok(result)
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let messages = self.messages.read().unwrap();
        Ok(messages.get(&id.0).cloned())
    }

    fn move_message(&self, id: &MessageId, target_folder: &str) -> Result<()> {
        if !self.has_folder(target_folder) {
            bail!("Target folder '{}' not found", target_folder);
        }

        let mut messages = self.messages.write().unwrap();
        let Some(message) = messages.get_mut(&id.0) else {
            bail!("Message '{}' not found", id);
        };
        message.folder_path = target_folder.to_string();
        Ok(())
    }

    fn count_messages(&self) -> Result<usize> {
        Ok(self.messages.read().unwrap().len())
    }

    fn clear(&self) -> Result<()> {
        self.folders.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_message(id: &str, folder: &str, age_hours: i64, read: bool) -> Message {
        Message::builder(id)
            .folder(folder)
            .subject(format!("Subject {}", id))
            .received_at(Utc::now() - Duration::hours(age_hours))
            .read(read)
            .build()
    }

    #[test]
    fn test_upsert_creates_folder_and_counts() {
        let store = InMemoryMailStore::new();
        store.upsert_message(make_message("m1", "Inbox", 1, false)).unwrap();
        store.upsert_message(make_message("m2", "Inbox", 2, true)).unwrap();

        let inbox = store.get_folder("Inbox").unwrap().unwrap();
        assert_eq!(inbox.message_count, 2);
        assert_eq!(inbox.unread_count, 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = InMemoryMailStore::new();
        let msg = make_message("m1", "Inbox", 1, false);
        store.upsert_message(msg.clone()).unwrap();
        store.upsert_message(msg).unwrap();
        assert_eq!(store.count_messages().unwrap(), 1);
    }

    #[test]
    fn test_list_messages_newest_first() {
        let store = InMemoryMailStore::new();
        store.upsert_message(make_message("old", "Inbox", 10, true)).unwrap();
        store.upsert_message(make_message("new", "Inbox", 1, true)).unwrap();

        let messages = store.list_messages("Inbox").unwrap();
        assert_eq!(messages[0].id.as_str(), "new");
        assert_eq!(messages[1].id.as_str(), "old");
    }

    #[test]
    fn test_list_unknown_folder_fails() {
        let store = InMemoryMailStore::new();
        let err = store.list_messages("Nope").unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_move_message() {
        let store = InMemoryMailStore::with_fixture();
        let id = MessageId::new("inbox-001");
        store.move_message(&id, "Custom/Archive").unwrap();

        let moved = store.get_message(&id).unwrap().unwrap();
        assert_eq!(moved.folder_path, "Custom/Archive");
        assert!(store.list_messages("Inbox").unwrap().iter().all(|m| m.id != id));
    }

    #[test]
    fn test_move_errors() {
        let store = InMemoryMailStore::with_fixture();
        assert!(store.move_message(&MessageId::new("missing"), "Inbox").is_err());
        assert!(store.move_message(&MessageId::new("inbox-001"), "Nope").is_err());
    }

    #[test]
    fn test_fixture_lists_all_folders() {
        let store = InMemoryMailStore::with_fixture();
        let folders = store.list_folders().unwrap();
        assert_eq!(folders.len(), 6);
        assert_eq!(folders[0].path, "Inbox");

        let total: usize = folders.iter().map(|f| f.message_count).sum();
        assert_eq!(total, store.list_all_messages().unwrap().len());
    }

    #[test]
    fn test_clear() {
        let store = InMemoryMailStore::with_fixture();
        store.clear().unwrap();
        assert_eq!(store.count_messages().unwrap(), 0);
        assert!(store.list_folders().unwrap().is_empty());
    }
}
