//! Error taxonomy for query operations
//!
//! Every engine-level failure is terminal for the current invocation. Each
//! variant maps to one human-readable message plus, where one exists, a
//! corrective suggestion for the caller to show.

use chrono::{DateTime, Utc};
use std::fmt;

/// Which resource ceiling was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Memory,
    Time,
    ResultCount,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Memory => "memory",
            ResourceKind::Time => "time",
            ResourceKind::ResultCount => "result-count",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad grouping used by callers to decide how to present a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied input that cannot be used
    UserInput,
    /// A configured ceiling stopped the operation
    ResourceLimit,
    /// The mail store failed
    Upstream,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid date format: '{input}'")]
    InvalidDateFormat { input: String },

    #[error("Invalid date range: since ({since}) is after until ({until})")]
    InvalidRange {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },

    #[error("Invalid {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },

    #[error("{kind} limit exceeded: {actual:.1} > {limit}")]
    ResourceExceeded {
        kind: ResourceKind,
        limit: f64,
        actual: f64,
    },

    #[error("Result set too large: {count} messages exceeds the streaming ceiling of {ceiling}")]
    ResultSetTooLarge { count: usize, ceiling: usize },

    #[error("Mail store failure: {0:#}")]
    Upstream(#[source] anyhow::Error),
}

impl QueryError {
    pub(crate) fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        QueryError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::InvalidDateFormat { .. }
            | QueryError::InvalidRange { .. }
            | QueryError::InvalidArgument { .. } => ErrorCategory::UserInput,
            QueryError::ResourceExceeded { .. } | QueryError::ResultSetTooLarge { .. } => {
                ErrorCategory::ResourceLimit
            }
            QueryError::Upstream(_) => ErrorCategory::Upstream,
        }
    }

    /// Recovery hint to show alongside the message
    pub fn suggestion(&self) -> Option<String> {
        let hint = match self {
            QueryError::InvalidDateFormat { .. } => {
                "Use a relative form like 7d, 2w, 3M, 1y, today, last-week, friday, \
                 last-monday, or an absolute date as YYYY-MM-DD."
                    .to_string()
            }
            QueryError::InvalidRange { .. } => {
                "Make sure --since is earlier than or equal to --until.".to_string()
            }
            QueryError::InvalidArgument { field: "folder", .. } => {
                "Run `mailq folders` to list the available folders.".to_string()
            }
            QueryError::InvalidArgument { field, .. } => {
                format!("Please check the {} value and try again.", field)
            }
            QueryError::ResourceExceeded { kind, .. } => match kind {
                ResourceKind::Memory => {
                    "Narrow the search with more filters, or raise MAILQ_MAX_MEMORY_MB.".to_string()
                }
                ResourceKind::Time => "Search a single folder or a shorter date range, or raise \
                     MAILQ_MAX_PROCESSING_TIME."
                    .to_string(),
                ResourceKind::ResultCount => "Add filters to reduce the number of matches, or \
                     raise MAILQ_MAX_RESULT_COUNT."
                    .to_string(),
            },
            QueryError::ResultSetTooLarge { .. } => {
                "Add filters (sender, subject, --since) to reduce the result set.".to_string()
            }
            QueryError::Upstream(_) => return None,
        };
        Some(hint)
    }
}
