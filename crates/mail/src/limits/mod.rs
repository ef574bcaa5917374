//! Resource ceilings for one query operation
//!
//! A [`ResourceGuard`] is created per operation and consulted at fixed
//! checkpoints: after filtering, after sorting, and between stream chunks.
//! The first ceiling crossed raises [`QueryError::ResourceExceeded`].
//!
//! [`QueryError::ResourceExceeded`]: crate::QueryError::ResourceExceeded

mod guard;
mod probe;

pub use guard::{ResourceGuard, ResourceLimits, ResourceUsage};
pub use probe::{FixedMemoryProbe, MemoryProbe, ProcessMemoryProbe};
