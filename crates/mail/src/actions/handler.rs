//! Action handler for message operations
//!
//! Thin coordination layer over a [`MailStore`] for the single-message
//! commands (open, move).

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;

use crate::models::{Message, MessageId};
use crate::storage::MailStore;

/// Outcome of a batch move. Individual failures do not abort the batch.
#[derive(Debug, Default, Clone)]
pub struct MoveReport {
    /// Messages that now live in the target folder
    pub moved: Vec<MessageId>,
    /// Messages that could not be moved, with the reason
    pub failed: Vec<(MessageId, String)>,
}

impl MoveReport {
    pub fn all_moved(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handler for message actions like open and move
pub struct ActionHandler {
    store: Arc<dyn MailStore>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }

    /// Fetch one message with its full content
    pub fn open_message(&self, id: &MessageId) -> Result<Message> {
        self.store
            .get_message(id)?
            .with_context(|| format!("Message '{}' not found", id))
    }

    /// Move a single message to `target_folder`
    pub fn move_message(&self, id: &MessageId, target_folder: &str) -> Result<()> {
        self.store.move_message(id, target_folder)?;
        info!("Moved message {} to {}", id, target_folder);
        Ok(())
    }

    /// Move several messages to `target_folder`
    pub fn move_messages(&self, ids: &[MessageId], target_folder: &str) -> MoveReport {
        let mut report = MoveReport::default();

        for id in ids {
            match self.store.move_message(id, target_folder) {
                Ok(()) => report.moved.push(id.clone()),
                Err(e) => {
                    warn!("Failed to move message {}: {:#}", id, e);
                    report.failed.push((id.clone(), format!("{:#}", e)));
                }
            }
        }

        info!(
            "Moved {} of {} messages to {}",
            report.moved.len(),
            ids.len(),
            target_folder
        );
        report
    }
}
