//! Experiment Tracking Sinks
//!
//! Destinations for metrics, parameters and artifacts produced by the
//! hooks. A hook holds exactly one sink, picked at construction; the
//! [`NoopSink`] stands in when tracking is disabled or unavailable.
//!
//! # Components
//!
//! - [`MetricsSink`]: the sink interface
//! - [`FileTrackingSink`]: local run directory store
//! - [`RecordingSink`]: in-memory sink shared between clones

pub mod file_store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::hooks::HookError;

pub use file_store::FileTrackingSink;

/// Metric name to numeric value.
pub type Metrics = BTreeMap<String, f64>;

/// Parameter name to rendered value.
pub type Params = BTreeMap<String, String>;

/// Receives metrics, parameters and artifact files.
pub trait MetricsSink {
    /// False for sinks standing in for disabled tracking.
    fn is_active(&self) -> bool {
        true
    }

    fn log_metrics(&self, metrics: &Metrics) -> Result<(), HookError>;

    fn log_params(&self, params: &Params) -> Result<(), HookError>;

    fn log_artifact(&self, path: &Path) -> Result<(), HookError>;
}

/// Sink used when tracking is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn is_active(&self) -> bool {
        false
    }

    fn log_metrics(&self, _metrics: &Metrics) -> Result<(), HookError> {
        Ok(())
    }

    fn log_params(&self, _params: &Params) -> Result<(), HookError> {
        Ok(())
    }

    fn log_artifact(&self, _path: &Path) -> Result<(), HookError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    metrics: Vec<Metrics>,
    params: Vec<Params>,
    artifacts: Vec<PathBuf>,
}

/// Keeps every call in memory.
///
/// Clones share one record, so a caller can hand a clone to a hook and
/// inspect what it received afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `log_metrics` call, in order.
    pub fn metrics(&self) -> Vec<Metrics> {
        self.recorded
            .lock()
            .map(|r| r.metrics.clone())
            .unwrap_or_default()
    }

    /// Every `log_params` call, in order.
    pub fn params(&self) -> Vec<Params> {
        self.recorded
            .lock()
            .map(|r| r.params.clone())
            .unwrap_or_default()
    }

    /// Every uploaded artifact path, in order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.recorded
            .lock()
            .map(|r| r.artifacts.clone())
            .unwrap_or_default()
    }

    /// Total number of calls received.
    pub fn call_count(&self) -> usize {
        self.recorded
            .lock()
            .map(|r| r.metrics.len() + r.params.len() + r.artifacts.len())
            .unwrap_or_default()
    }

    fn record(&self, apply: impl FnOnce(&mut Recorded)) -> Result<(), HookError> {
        let mut recorded = self
            .recorded
            .lock()
            .map_err(|_| HookError::Tracking("recording sink lock poisoned".to_string()))?;
        apply(&mut recorded);
        Ok(())
    }
}

impl MetricsSink for RecordingSink {
    fn log_metrics(&self, metrics: &Metrics) -> Result<(), HookError> {
        self.record(|r| r.metrics.push(metrics.clone()))
    }

    fn log_params(&self, params: &Params) -> Result<(), HookError> {
        self.record(|r| r.params.push(params.clone()))
    }

    fn log_artifact(&self, path: &Path) -> Result<(), HookError> {
        self.record(|r| r.artifacts.push(path.to_path_buf()))
    }
}
