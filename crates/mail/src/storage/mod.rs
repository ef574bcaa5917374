//! Storage traits and implementations
//!
//! This module defines the mail-store abstraction consumed by the query
//! engine. The trait-based design allows swapping between the in-memory
//! fixture store and the SQLite-backed store.

mod fixture;
mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryMailStore;
pub use sqlite::SqliteMailStore;
pub use traits::MailStore;
