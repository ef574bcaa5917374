use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use serde::Serialize;

use crate::limits::{MemoryProbe, ProcessMemoryProbe};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Measurements for one completed operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub operation: String,
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,
    /// Memory growth across the operation; negative when memory was released
    pub memory_delta_mb: f64,
    pub peak_memory_mb: f64,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

struct ActiveOperation {
    started: Instant,
    start_memory_mb: f64,
}

/// Brackets named operations with timing and memory readings
pub struct PerformanceMonitor {
    probe: Arc<dyn MemoryProbe>,
    active: HashMap<String, ActiveOperation>,
    completed: HashMap<String, PerformanceMetrics>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(Arc::new(ProcessMemoryProbe))
    }
}

impl PerformanceMonitor {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            active: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    fn memory_mb(&self) -> f64 {
        self.probe.resident_bytes() as f64 / BYTES_PER_MB
    }

    fn begin(&self) -> ActiveOperation {
        ActiveOperation {
            started: Instant::now(),
            start_memory_mb: self.memory_mb(),
        }
    }

    fn finish(&mut self, operation: &str, active: ActiveOperation) -> PerformanceMetrics {
        let current = self.memory_mb();
        let metrics = PerformanceMetrics {
            operation: operation.to_string(),
            duration: active.started.elapsed(),
            memory_delta_mb: current - active.start_memory_mb,
            peak_memory_mb: current.max(active.start_memory_mb),
        };
        self.completed.insert(operation.to_string(), metrics.clone());
        metrics
    }

    /// Begin timing `operation`; restarting an active name resets it
    pub fn start(&mut self, operation: &str) {
        let active = self.begin();
        self.active.insert(operation.to_string(), active);
    }

    /// Finish timing `operation` and keep its metrics
    pub fn stop(&mut self, operation: &str) -> Result<PerformanceMetrics> {
        let Some(active) = self.active.remove(operation) else {
            bail!("Operation '{}' was not being monitored", operation);
        };
        Ok(self.finish(operation, active))
    }

    /// Run `f` bracketed by a start/stop pair for `operation`
    pub fn measure<R>(
        &mut self,
        operation: &str,
        f: impl FnOnce() -> R,
    ) -> (R, PerformanceMetrics) {
        let active = self.begin();
        let value = f();
        (value, self.finish(operation, active))
    }

    /// Metrics of the last completed run of `operation`
    pub fn get_metrics(&self, operation: &str) -> Option<&PerformanceMetrics> {
        self.completed.get(operation)
    }

    pub fn is_active(&self, operation: &str) -> bool {
        self.active.contains_key(operation)
    }
}
