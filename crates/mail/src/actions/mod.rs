//! Email actions module
//!
//! Provides high-level action handlers for message lookups and moves
//! between folders.

mod handler;

pub use handler::{ActionHandler, MoveReport};
