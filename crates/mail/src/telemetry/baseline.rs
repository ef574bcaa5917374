use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::monitor::PerformanceMetrics;
use crate::settings::EngineSettings;

/// Reference measurements for one operation name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub duration_secs: f64,
    pub memory_mb: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of comparing a run against its baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub operation: String,
    pub baseline: Baseline,
    pub duration_secs: f64,
    pub memory_mb: f64,
    pub duration_regressed: bool,
    pub memory_regressed: bool,
}

impl Regression {
    pub fn is_regression(&self) -> bool {
        self.duration_regressed || self.memory_regressed
    }
}

/// Baselines keyed by operation name, optionally persisted as JSON
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: Option<PathBuf>,
    tolerance: f64,
    baselines: HashMap<String, Baseline>,
}

impl BaselineStore {
    /// Store without persistence
    pub fn in_memory(tolerance: f64) -> Self {
        Self {
            path: None,
            tolerance,
            baselines: HashMap::new(),
        }
    }

    /// Load baselines from `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>, tolerance: f64) -> Self {
        let path = path.into();
        let baselines = if path.exists() {
            match config::load_json_file::<HashMap<String, Baseline>>(&path) {
                Ok(baselines) => baselines,
                Err(e) => {
                    warn!("Ignoring unreadable baseline file: {:#}", e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        Self {
            path: Some(path),
            tolerance,
            baselines,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        match settings.baseline_file() {
            Some(path) => Self::open(path, settings.baseline_tolerance),
            None => Self::in_memory(settings.baseline_tolerance),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn get(&self, operation: &str) -> Option<&Baseline> {
        self.baselines.get(operation)
    }

    /// Replace the baseline for `operation`
    pub fn record(&mut self, operation: &str, duration_secs: f64, memory_mb: f64) {
        self.baselines.insert(
            operation.to_string(),
            Baseline {
                duration_secs,
                memory_mb,
                recorded_at: Utc::now(),
            },
        );
        self.persist();
    }

    /// Compare a run to the stored baseline.
    ///
    /// The first observation of an operation becomes its baseline and
    /// returns `None`.
    pub fn check_regression(
        &mut self,
        operation: &str,
        duration_secs: f64,
        memory_mb: f64,
    ) -> Option<Regression> {
        let Some(baseline) = self.baselines.get(operation).cloned() else {
            self.record(operation, duration_secs, memory_mb);
            return None;
        };

        let regression = Regression {
            operation: operation.to_string(),
            duration_regressed: duration_secs > baseline.duration_secs * self.tolerance,
            memory_regressed: memory_mb > baseline.memory_mb * self.tolerance,
            duration_secs,
            memory_mb,
            baseline,
        };
        if regression.is_regression() {
            warn!(
                "Performance regression in '{}': {:.3}s / {:.1}MB vs baseline {:.3}s / {:.1}MB",
                operation,
                duration_secs,
                memory_mb,
                regression.baseline.duration_secs,
                regression.baseline.memory_mb
            );
        }
        Some(regression)
    }

    /// Convenience wrapper over [`BaselineStore::check_regression`]
    pub fn check_metrics(&mut self, metrics: &PerformanceMetrics) -> Option<Regression> {
        self.check_regression(
            &metrics.operation,
            metrics.duration.as_secs_f64(),
            metrics.memory_delta_mb.max(0.0),
        )
    }

    fn persist(&self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        match config::save_json_file(path, &self.baselines) {
            Ok(()) => info!("Saved performance baselines to {}", path.display()),
            Err(e) => warn!("Failed to save performance baselines: {:#}", e),
        }
    }
}
