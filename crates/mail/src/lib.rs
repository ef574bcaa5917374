//! Mail crate - Query engine for locally materialized mailboxes
//!
//! This crate provides the platform-independent core of mailq:
//! - Domain models (Message, Folder, EmailAddress)
//! - Mail-store trait with in-memory and SQLite implementations
//! - Date expressions, filter criteria and selectivity-ordered evaluation
//! - Stable sorting, random-access paging and guarded chunk streaming
//! - Resource ceilings (time, memory, result count)
//! - Telemetry: performance metrics, audit trail, regression baselines
//! - Action handlers for mutations (open, move)
//!
//! Everything runs synchronously on the caller's thread; collaborators are
//! passed in through [`OperationContext`] rather than held globally.

pub mod actions;
pub mod engine;
pub mod error;
pub mod limits;
pub mod models;
pub mod query;
pub mod settings;
pub mod storage;
pub mod telemetry;

pub use actions::{ActionHandler, MoveReport};
pub use engine::{OperationContext, QueryEngine, QueryRequest, QueryResults};
pub use error::{ErrorCategory, QueryError, ResourceKind};
pub use limits::{
    FixedMemoryProbe, MemoryProbe, ProcessMemoryProbe, ResourceGuard, ResourceLimits,
    ResourceUsage,
};
pub use models::{EmailAddress, Folder, Importance, Message, MessageBuilder, MessageId};
pub use query::{
    CancellationToken, ChunkStream, FilterArgs, FilterCriteria, PageInfo, Paginator,
    SortDirection, SortField, SortSpec, StreamChunk, StreamOptions, StreamingPaginator,
    build_criteria, parse_date_expression,
};
pub use settings::EngineSettings;
pub use storage::{InMemoryMailStore, MailStore, SqliteMailStore};
pub use telemetry::{AuditLogger, BaselineStore, PerformanceMonitor};
