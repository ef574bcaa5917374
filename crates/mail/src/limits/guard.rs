use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use super::probe::{MemoryProbe, ProcessMemoryProbe};
use crate::error::{QueryError, ResourceKind};
use crate::settings::EngineSettings;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-operation ceilings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimits {
    pub max_memory_mb: u64,
    pub max_processing_time: Duration,
    pub max_result_count: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl ResourceLimits {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            max_memory_mb: settings.max_memory_mb,
            max_processing_time: Duration::from_secs(settings.max_processing_time_secs),
            max_result_count: settings.max_result_count,
        }
    }
}

/// Point-in-time view of what a guarded operation has consumed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    pub elapsed: Duration,
    pub memory_mb: f64,
    pub peak_memory_mb: f64,
    pub result_count: usize,
    pub checks: usize,
}

/// Tracks one operation against its [`ResourceLimits`]
pub struct ResourceGuard {
    limits: ResourceLimits,
    probe: Arc<dyn MemoryProbe>,
    started: Instant,
    result_count: usize,
    memory_mb: f64,
    peak_memory_mb: f64,
    checks: usize,
}

impl ResourceGuard {
    /// Guard measuring the current process, starting now
    pub fn new(limits: ResourceLimits) -> Self {
        Self::with_probe(limits, Arc::new(ProcessMemoryProbe))
    }

    pub fn with_probe(limits: ResourceLimits, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            limits,
            probe,
            started: Instant::now(),
            result_count: 0,
            memory_mb: 0.0,
            peak_memory_mb: 0.0,
            checks: 0,
        }
    }

    /// Override the instant elapsed time is measured from
    pub fn started_at(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Record how many results are currently materialized
    pub fn record_results(&mut self, count: usize) {
        self.result_count = count;
    }

    /// Compare current consumption against every ceiling.
    ///
    /// Ceilings are checked in order time, memory, result count; the first
    /// one crossed is reported.
    pub fn check(&mut self) -> Result<(), QueryError> {
        self.checks += 1;

        let elapsed = self.started.elapsed();
        if elapsed > self.limits.max_processing_time {
            return Err(QueryError::ResourceExceeded {
                kind: ResourceKind::Time,
                limit: self.limits.max_processing_time.as_secs_f64(),
                actual: elapsed.as_secs_f64(),
            });
        }

        self.memory_mb = self.probe.resident_bytes() as f64 / BYTES_PER_MB;
        self.peak_memory_mb = self.peak_memory_mb.max(self.memory_mb);
        if self.memory_mb > self.limits.max_memory_mb as f64 {
            return Err(QueryError::ResourceExceeded {
                kind: ResourceKind::Memory,
                limit: self.limits.max_memory_mb as f64,
                actual: self.memory_mb,
            });
        }

        if self.result_count > self.limits.max_result_count {
            return Err(QueryError::ResourceExceeded {
                kind: ResourceKind::ResultCount,
                limit: self.limits.max_result_count as f64,
                actual: self.result_count as f64,
            });
        }

        debug!(
            "resource check #{}: {:.1}MB, {} results, {:?} elapsed",
            self.checks, self.memory_mb, self.result_count, elapsed
        );
        Ok(())
    }

    pub fn usage(&self) -> ResourceUsage {
        ResourceUsage {
            elapsed: self.started.elapsed(),
            memory_mb: self.memory_mb,
            peak_memory_mb: self.peak_memory_mb,
            result_count: self.result_count,
            checks: self.checks,
        }
    }
}

impl std::fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("limits", &self.limits)
            .field("usage", &self.usage())
            .finish()
    }
}
