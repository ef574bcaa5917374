//! Engine settings
//!
//! Loaded in order of priority (later wins):
//! 1. Built-in defaults
//! 2. JSON file (~/.config/mailq/engine.json), if present
//! 3. `MAILQ_*` environment variables

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename in the mailq config directory
const SETTINGS_FILE: &str = "engine.json";
const AUDIT_LOG_FILE: &str = "audit.log";
const BASELINE_FILE: &str = "baselines.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Memory ceiling in megabytes
    pub max_memory_mb: u64,
    /// Wall-clock ceiling per operation in seconds
    pub max_processing_time_secs: u64,
    /// Ceiling on materialized results
    pub max_result_count: usize,
    /// Result count above which streaming logs a warning
    pub large_result_threshold: usize,
    /// Result count above which streaming refuses to start
    pub stream_ceiling: usize,
    pub audit_enabled: bool,
    /// Regression factor; 1.2 flags anything more than 20% above baseline
    pub baseline_tolerance: f64,
    pub page_size: usize,
    pub chunk_size: usize,
    /// Audit log location, defaults to the config directory
    pub audit_log_path: Option<PathBuf>,
    /// Baseline file location, defaults to the config directory
    pub baseline_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_memory_mb: 1024,
            max_processing_time_secs: 300,
            max_result_count: 50_000,
            large_result_threshold: 1000,
            stream_ceiling: 50_000,
            audit_enabled: true,
            baseline_tolerance: 1.2,
            page_size: 10,
            chunk_size: 50,
            audit_log_path: None,
            baseline_path: None,
        }
    }
}

impl EngineSettings {
    /// Load settings from defaults, the config file and the environment
    pub fn load() -> Result<Self> {
        let mut settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific JSON file, without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = config::load_json_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `MAILQ_*` environment overrides on top of the current values
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = config::env_override("MAILQ_MAX_MEMORY_MB")? {
            self.max_memory_mb = v;
        }
        if let Some(v) = config::env_override("MAILQ_MAX_PROCESSING_TIME")? {
            self.max_processing_time_secs = v;
        }
        if let Some(v) = config::env_override("MAILQ_MAX_RESULT_COUNT")? {
            self.max_result_count = v;
        }
        if let Some(v) = config::env_override("MAILQ_LARGE_RESULT_THRESHOLD")? {
            self.large_result_threshold = v;
        }
        if let Some(v) = config::env_override("MAILQ_STREAM_CEILING")? {
            self.stream_ceiling = v;
        }
        if let Some(raw) = config::env_override::<String>("MAILQ_AUDIT_ENABLED")? {
            self.audit_enabled = config::parse_flag(&raw)
                .with_context(|| format!("Invalid value for MAILQ_AUDIT_ENABLED: {:?}", raw))?;
        }
        if let Some(v) = config::env_override("MAILQ_BASELINE_TOLERANCE")? {
            self.baseline_tolerance = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page_size must be at least 1");
        ensure!(self.chunk_size > 0, "chunk_size must be at least 1");
        ensure!(
            self.baseline_tolerance.is_finite() && self.baseline_tolerance > 0.0,
            "baseline_tolerance must be a positive number, got {}",
            self.baseline_tolerance
        );
        Ok(())
    }

    /// Resolved audit log path
    pub fn audit_log_file(&self) -> Option<PathBuf> {
        self.audit_log_path
            .clone()
            .or_else(|| config::config_path(AUDIT_LOG_FILE))
    }

    /// Resolved baseline file path
    pub fn baseline_file(&self) -> Option<PathBuf> {
        self.baseline_path
            .clone()
            .or_else(|| config::config_path(BASELINE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_memory_mb, 1024);
        assert_eq!(settings.max_processing_time_secs, 300);
        assert_eq!(settings.max_result_count, 50_000);
        assert_eq!(settings.large_result_threshold, 1000);
        assert_eq!(settings.stream_ceiling, 50_000);
        assert!(settings.audit_enabled);
        assert_eq!(settings.baseline_tolerance, 1.2);
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.chunk_size, 50);
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "max_memory_mb": 256, "audit_enabled": false }"#).unwrap();

        let settings = EngineSettings::from_file(&path).unwrap();
        assert_eq!(settings.max_memory_mb, 256);
        assert!(!settings.audit_enabled);
        assert_eq!(settings.page_size, 10);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "chunk_size": 0 }"#).unwrap();
        assert!(EngineSettings::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: these variables are only touched by this test
        unsafe {
            std::env::set_var("MAILQ_MAX_MEMORY_MB", "512");
            std::env::set_var("MAILQ_AUDIT_ENABLED", "off");
            std::env::set_var("MAILQ_BASELINE_TOLERANCE", "1.5");
        }
        let mut settings = EngineSettings::default();
        let applied = settings.apply_env();

        unsafe {
            std::env::set_var("MAILQ_AUDIT_ENABLED", "sometimes");
        }
        let rejected = EngineSettings::default().apply_env();

        unsafe {
            std::env::remove_var("MAILQ_MAX_MEMORY_MB");
            std::env::remove_var("MAILQ_AUDIT_ENABLED");
            std::env::remove_var("MAILQ_BASELINE_TOLERANCE");
        }

        applied.unwrap();
        assert_eq!(settings.max_memory_mb, 512);
        assert!(!settings.audit_enabled);
        assert_eq!(settings.baseline_tolerance, 1.5);
        assert!(
            rejected
                .unwrap_err()
                .to_string()
                .contains("MAILQ_AUDIT_ENABLED")
        );
    }

    #[test]
    fn test_explicit_paths_win() {
        let settings = EngineSettings {
            audit_log_path: Some(PathBuf::from("/tmp/mailq-audit.log")),
            ..Default::default()
        };
        assert_eq!(
            settings.audit_log_file(),
            Some(PathBuf::from("/tmp/mailq-audit.log"))
        );
    }
}
