use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::monitor::PerformanceMetrics;
use crate::error::QueryError;
use crate::query::FilterCriteria;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    FilterOperation,
    PerformanceMetrics,
    FailedOperation,
}

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub actor: String,
    pub kind: AuditKind,
    pub details: serde_json::Value,
    pub result_count: usize,
}

/// Append-only JSON-lines audit trail
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: Option<PathBuf>,
    actor: String,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, actor: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            actor: actor.into(),
            enabled: true,
        }
    }

    /// Logger that records nothing
    pub fn disabled() -> Self {
        Self {
            path: None,
            actor: String::new(),
            enabled: false,
        }
    }

    pub fn from_settings(settings: &EngineSettings, actor: impl Into<String>) -> Self {
        match settings.audit_log_file() {
            Some(path) if settings.audit_enabled => Self::new(path, actor),
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.path.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Record one filter invocation with its normalized criteria
    pub fn log_filter_operation(
        &self,
        operation: &str,
        criteria: &FilterCriteria,
        result_count: usize,
    ) {
        let details = serde_json::to_value(criteria).unwrap_or_default();
        self.record(operation, AuditKind::FilterOperation, details, result_count);
    }

    pub fn log_performance(
        &self,
        operation: &str,
        metrics: &PerformanceMetrics,
        result_count: usize,
    ) {
        let details = serde_json::to_value(metrics).unwrap_or_default();
        self.record(operation, AuditKind::PerformanceMetrics, details, result_count);
    }

    /// Record an invocation that ended in an error
    pub fn log_failed_operation(
        &self,
        operation: &str,
        criteria: &FilterCriteria,
        error: &QueryError,
    ) {
        let details = serde_json::json!({
            "criteria": criteria,
            "category": format!("{:?}", error.category()),
            "error": error.to_string(),
        });
        self.record(operation, AuditKind::FailedOperation, details, 0);
    }

    fn record(
        &self,
        operation: &str,
        kind: AuditKind,
        details: serde_json::Value,
        result_count: usize,
    ) {
        if !self.enabled {
            return;
        }
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let entry = AuditEntry {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            actor: self.actor.clone(),
            kind,
            details,
            result_count,
        };
        if let Err(e) = append_entry(path, &entry) {
            warn!("Failed to write audit entry: {:#}", e);
        }
    }

    /// The last `limit` readable entries, oldest first. Malformed lines are
    /// skipped; a missing log reads as empty.
    pub fn recent_entries(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read audit log: {}", path.display()))?;
        let entries: Vec<AuditEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

fn append_entry(path: &Path, entry: &AuditEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
    let line = serde_json::to_string(entry)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ReadStatus;
    use std::time::Duration;

    #[test]
    fn test_entries_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("logs/audit.log"), "tester");
        let criteria = FilterCriteria::builder()
            .sender("Alice")
            .read_status(ReadStatus::Unread)
            .build()
            .unwrap();

        logger.log_filter_operation("find", &criteria, 3);
        logger.log_performance(
            "find",
            &PerformanceMetrics {
                operation: "find".to_string(),
                duration: Duration::from_millis(1500),
                memory_delta_mb: 2.0,
                peak_memory_mb: 40.0,
            },
            3,
        );

        let entries = logger.recent_entries(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, AuditKind::FilterOperation);
        assert_eq!(entries[0].actor, "tester");
        assert_eq!(entries[0].result_count, 3);
        assert_eq!(entries[0].details["sender"], "alice");
        assert_eq!(entries[1].kind, AuditKind::PerformanceMetrics);
        assert_eq!(entries[1].details["duration"], 1.5);
    }

    #[test]
    fn test_recent_entries_limit_and_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let logger = AuditLogger::new(&path, "tester");
        let criteria = FilterCriteria::match_all();
        for count in 0..5 {
            logger.log_filter_operation("read", &criteria, count);
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();

        let entries = logger.recent_entries(2).unwrap();
        let counts: Vec<_> = entries.iter().map(|e| e.result_count).collect();
        assert_eq!(counts, [3, 4]);
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let mut logger = AuditLogger::new(&path, "tester");
        logger.set_enabled(false);
        logger.log_filter_operation("find", &FilterCriteria::match_all(), 1);
        assert!(!path.exists());
        assert!(AuditLogger::disabled().recent_entries(10).unwrap().is_empty());
    }
}
