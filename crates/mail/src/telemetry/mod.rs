//! Observational telemetry for query operations
//!
//! Nothing here changes query results: write failures are logged and
//! swallowed.

mod audit;
mod baseline;
mod monitor;

pub use audit::{AuditEntry, AuditKind, AuditLogger};
pub use baseline::{Baseline, BaselineStore, Regression};
pub use monitor::{PerformanceMetrics, PerformanceMonitor};
