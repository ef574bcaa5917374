//! Domain models for mail entities

mod folder;
mod message;

pub use folder::Folder;
pub use message::{EmailAddress, Importance, Message, MessageBuilder, MessageId};
