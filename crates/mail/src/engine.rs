//! Query orchestration
//!
//! One [`QueryEngine::execute`] call runs a single fetch, filter, sort pass
//! under a fresh [`ResourceGuard`], records telemetry, and hands back
//! [`QueryResults`] that can be paged or streamed.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::QueryError;
use crate::limits::{MemoryProbe, ProcessMemoryProbe, ResourceGuard, ResourceLimits, ResourceUsage};
use crate::models::Message;
use crate::query::{
    CancellationToken, ChunkStream, FilterCriteria, FilterStep, Paginator, SelectivityEstimator,
    SortSpec, StreamOptions, StreamingPaginator, evaluate_with, sort_in_place,
};
use crate::settings::EngineSettings;
use crate::storage::MailStore;
use crate::telemetry::{AuditLogger, BaselineStore, PerformanceMetrics, PerformanceMonitor, Regression};

/// What to run: a named operation over validated criteria
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Operation name used for telemetry (e.g. "find", "read")
    pub operation: String,
    pub criteria: FilterCriteria,
    pub sort: SortSpec,
}

impl QueryRequest {
    pub fn new(operation: impl Into<String>, criteria: FilterCriteria) -> Self {
        Self {
            operation: operation.into(),
            criteria,
            sort: SortSpec::default(),
        }
    }

    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }
}

/// Collaborators for query operations, passed in rather than global
pub struct OperationContext {
    pub settings: EngineSettings,
    pub probe: Arc<dyn MemoryProbe>,
    pub monitor: PerformanceMonitor,
    pub audit: AuditLogger,
    pub baselines: BaselineStore,
    pub estimator: SelectivityEstimator,
}

impl OperationContext {
    /// Context backed by the process memory probe and the configured
    /// audit log and baseline files
    pub fn new(settings: EngineSettings) -> Self {
        let probe: Arc<dyn MemoryProbe> = Arc::new(ProcessMemoryProbe);
        Self {
            audit: AuditLogger::from_settings(&settings, current_actor()),
            baselines: BaselineStore::from_settings(&settings),
            monitor: PerformanceMonitor::new(probe.clone()),
            estimator: SelectivityEstimator::default(),
            probe,
            settings,
        }
    }

    /// Context that writes nothing to disk
    pub fn ephemeral(settings: EngineSettings, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            audit: AuditLogger::disabled(),
            baselines: BaselineStore::in_memory(settings.baseline_tolerance),
            monitor: PerformanceMonitor::new(probe.clone()),
            estimator: SelectivityEstimator::default(),
            probe,
            settings,
        }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_baselines(mut self, baselines: BaselineStore) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn with_estimator(mut self, estimator: SelectivityEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            large_result_threshold: self.settings.large_result_threshold,
            ceiling: self.settings.stream_ceiling,
        }
    }
}

fn current_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

pub struct QueryEngine {
    store: Arc<dyn MailStore>,
    context: OperationContext,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn MailStore>, context: OperationContext) -> Self {
        Self { store, context }
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut OperationContext {
        &mut self.context
    }

    /// Run one filter and sort pass. A failed pass still stops its monitor
    /// entry and leaves a failure record in the audit log.
    pub fn execute(&mut self, request: &QueryRequest) -> Result<QueryResults, QueryError> {
        let operation = request.operation.as_str();
        self.context.monitor.start(operation);

        let result = self.run(request);
        if let Err(e) = &result {
            self.context.monitor.stop(operation).ok();
            warn!("{} failed: {}", operation, e);
            self.context
                .audit
                .log_failed_operation(operation, &request.criteria, e);
        }
        result
    }

    fn run(&mut self, request: &QueryRequest) -> Result<QueryResults, QueryError> {
        let operation = request.operation.as_str();
        let mut guard = ResourceGuard::with_probe(
            ResourceLimits::from_settings(&self.context.settings),
            self.context.probe.clone(),
        );

        let messages = self.fetch(&request.criteria)?;
        let scanned = messages.len();

        let outcome = evaluate_with(&messages, &request.criteria, &self.context.estimator);
        drop(messages);
        guard.record_results(outcome.messages.len());
        guard.check()?;

        let mut sorted = outcome.messages;
        sort_in_place(&mut sorted, request.sort);
        guard.check()?;

        let metrics = self.context.monitor.stop(operation).ok();
        let regression = metrics
            .as_ref()
            .and_then(|m| self.context.baselines.check_metrics(m));

        self.context
            .audit
            .log_filter_operation(operation, &request.criteria, sorted.len());
        if let Some(metrics) = &metrics {
            self.context
                .audit
                .log_performance(operation, metrics, sorted.len());
        }

        info!(
            "{}: {} of {} messages matched ({} comparisons, sorted by {})",
            operation,
            sorted.len(),
            scanned,
            outcome.comparisons,
            request.sort.field
        );

        Ok(QueryResults {
            messages: sorted,
            scanned,
            steps: outcome.steps,
            comparisons: outcome.comparisons,
            short_circuited: outcome.short_circuited,
            metrics,
            regression,
            guard,
            stream_options: self.context.stream_options(),
            page_size: self.context.settings.page_size,
            chunk_size: self.context.settings.chunk_size,
        })
    }

    /// Pull the raw sequence from the store: the named folders when the
    /// criteria scope to folders, everything otherwise. Each folder is read
    /// once however many spellings name it.
    fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Message>, QueryError> {
        if criteria.folders().is_empty() {
            return self.store.list_all_messages().map_err(QueryError::Upstream);
        }

        let known = self.store.list_folders().map_err(QueryError::Upstream)?;
        let mut paths: Vec<&str> = Vec::with_capacity(criteria.folders().len());
        for requested in criteria.folders() {
            let folder = known
                .iter()
                .find(|f| f.path.eq_ignore_ascii_case(requested))
                .ok_or_else(|| {
                    QueryError::invalid_argument("folder", format!("folder '{}' not found", requested))
                })?;
            if !paths.contains(&folder.path.as_str()) {
                paths.push(&folder.path);
            }
        }

        let mut messages = Vec::new();
        for path in paths {
            debug!("Fetching folder {}", path);
            messages.extend(self.store.list_messages(path).map_err(QueryError::Upstream)?);
        }
        Ok(messages)
    }
}

/// Filtered and sorted messages plus how they were produced
#[derive(Debug)]
pub struct QueryResults {
    messages: Vec<Message>,
    scanned: usize,
    steps: Vec<FilterStep>,
    comparisons: usize,
    short_circuited: bool,
    metrics: Option<PerformanceMetrics>,
    regression: Option<Regression>,
    guard: ResourceGuard,
    stream_options: StreamOptions,
    page_size: usize,
    chunk_size: usize,
}

impl QueryResults {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages fetched before filtering
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Applied filter steps in evaluation order
    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    pub fn short_circuited(&self) -> bool {
        self.short_circuited
    }

    pub fn metrics(&self) -> Option<&PerformanceMetrics> {
        self.metrics.as_ref()
    }

    pub fn regression(&self) -> Option<&Regression> {
        self.regression.as_ref()
    }

    pub fn usage(&self) -> ResourceUsage {
        self.guard.usage()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Page through the results with the configured page size
    pub fn into_paginator(self) -> Result<Paginator<Message>, QueryError> {
        let page_size = self.page_size;
        self.paginate(page_size)
    }

    pub fn paginate(self, page_size: usize) -> Result<Paginator<Message>, QueryError> {
        Paginator::new(self.messages, page_size)
    }

    /// Stream the results with the configured chunk size
    pub fn into_stream(self, cancellation: CancellationToken) -> Result<ChunkStream<Message>, QueryError> {
        let chunk_size = self.chunk_size;
        self.stream(chunk_size, cancellation)
    }

    /// Stream the results; the operation's guard keeps running between chunks
    pub fn stream(
        self,
        chunk_size: usize,
        cancellation: CancellationToken,
    ) -> Result<ChunkStream<Message>, QueryError> {
        StreamingPaginator::new(self.messages, self.stream_options)
            .with_guard(self.guard)
            .with_cancellation(cancellation)
            .produce_chunks(chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;
    use crate::limits::FixedMemoryProbe;
    use crate::query::{FilterArgs, ReadStatus, SortDirection, SortField, build_criteria};
    use crate::storage::InMemoryMailStore;
    use crate::telemetry::AuditKind;

    fn engine_with(settings: EngineSettings, probe: Arc<FixedMemoryProbe>) -> QueryEngine {
        let store: Arc<dyn MailStore> = Arc::new(InMemoryMailStore::with_fixture());
        QueryEngine::new(store, OperationContext::ephemeral(settings, probe))
    }

    fn engine() -> QueryEngine {
        engine_with(
            EngineSettings::default(),
            Arc::new(FixedMemoryProbe::from_mb(64)),
        )
    }

    #[test]
    fn test_unfiltered_query_returns_everything_newest_first() {
        let mut engine = engine();
        let results = engine
            .execute(&QueryRequest::new("find", FilterCriteria::match_all()))
            .unwrap();

        assert_eq!(results.len(), results.scanned());
        assert!(results.steps().is_empty());
        let times: Vec<_> = results.messages().iter().map(|m| m.received_at).collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));
        assert!(results.metrics().is_some());
        assert!(results.regression().is_none());
    }

    #[test]
    fn test_folder_scope_is_case_insensitive() {
        let mut engine = engine();
        let criteria = FilterCriteria::builder()
            .folders(["inbox"])
            .read_status(ReadStatus::Unread)
            .build()
            .unwrap();
        let results = engine.execute(&QueryRequest::new("read", criteria)).unwrap();

        assert!(!results.is_empty());
        assert!(
            results
                .messages()
                .iter()
                .all(|m| m.folder_path == "Inbox" && !m.is_read)
        );
    }

    #[test]
    fn test_unknown_folder_is_user_error() {
        let mut engine = engine();
        let criteria = FilterCriteria::builder()
            .folders(["Nowhere"])
            .build()
            .unwrap();
        let err = engine
            .execute(&QueryRequest::new("read", criteria))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument { field: "folder", .. }));
    }

    #[test]
    fn test_failed_query_stops_monitor_and_is_audited() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLogger::new(dir.path().join("audit.log"), "tester");
        let mut engine = engine();
        engine.context_mut().audit = audit.clone();

        let criteria = FilterCriteria::builder()
            .folders(["Nowhere"])
            .build()
            .unwrap();
        assert!(engine.execute(&QueryRequest::new("read", criteria)).is_err());
        assert!(!engine.context().monitor.is_active("read"));

        let entries = audit.recent_entries(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::FailedOperation);
        assert_eq!(entries[0].result_count, 0);
        assert!(
            entries[0].details["error"]
                .as_str()
                .unwrap()
                .contains("Nowhere")
        );

        // The same operation name can run again afterwards
        let results = engine
            .execute(&QueryRequest::new("read", FilterCriteria::match_all()))
            .unwrap();
        assert!(results.metrics().is_some());
    }

    #[test]
    fn test_guard_failure_stops_monitor() {
        let settings = EngineSettings {
            max_memory_mb: 16,
            ..Default::default()
        };
        let mut engine = engine_with(settings, Arc::new(FixedMemoryProbe::from_mb(64)));
        let err = engine
            .execute(&QueryRequest::new("find", FilterCriteria::match_all()))
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::ResourceExceeded {
                kind: ResourceKind::Memory,
                ..
            }
        ));
        assert!(!engine.context().monitor.is_active("find"));
    }

    #[test]
    fn test_sort_request_is_applied() {
        let mut engine = engine();
        let criteria = build_criteria(&FilterArgs {
            folders: vec!["Inbox".to_string()],
            ..Default::default()
        })
        .unwrap();
        let request = QueryRequest::new("find", criteria)
            .sorted_by(SortSpec::new(SortField::Importance, SortDirection::Descending));
        let results = engine.execute(&request).unwrap();

        let ranks: Vec<_> = results.messages().iter().map(|m| m.importance).collect();
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_result_count_ceiling_stops_operation() {
        let settings = EngineSettings {
            max_result_count: 2,
            ..Default::default()
        };
        let mut engine = engine_with(settings, Arc::new(FixedMemoryProbe::from_mb(64)));
        let err = engine
            .execute(&QueryRequest::new("find", FilterCriteria::match_all()))
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::ResourceExceeded {
                kind: ResourceKind::ResultCount,
                ..
            }
        ));
    }

    #[test]
    fn test_results_stream_with_configured_chunk_size() {
        let settings = EngineSettings {
            chunk_size: 4,
            ..Default::default()
        };
        let mut engine = engine_with(settings, Arc::new(FixedMemoryProbe::from_mb(64)));
        let results = engine
            .execute(&QueryRequest::new("find", FilterCriteria::match_all()))
            .unwrap();
        let expected = results.messages().to_vec();

        let streamed: Vec<Message> = results
            .into_stream(CancellationToken::new())
            .unwrap()
            .map(Result::unwrap)
            .flat_map(|chunk| chunk.items)
            .collect();
        assert_eq!(streamed, expected);
    }
}
