//! Lifecycle Hooks
//!
//! Observers plugged into a pipeline host. The host raises three
//! callbacks per run and every hook reacts to them passively:
//!
//! 1. `before_task` - a task is about to run
//! 2. `after_task` - the task finished and its outputs are known
//! 3. `after_pipeline` - every task finished
//!
//! # Components
//!
//! - [`TimeLoggerHook`]: per-task durations, Gantt chart, tracking upload
//! - [`CatalogLoggerHook`]: logs task inputs/outputs to a tracking sink
//! - [`MetricNamer`]: strategy deriving a metric name from a task
//! - [`Clock`]: wall-clock source, swappable in tests

pub mod catalog_logger;
pub mod clock;
pub mod config;
pub mod naming;
pub mod time_logger;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::pipeline::{DataMap, Task};

pub use catalog_logger::{CatalogEntry, CatalogLoggerHook, FileFormat};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_hooks_config, CatalogLoggerConfig, HooksConfig, TimeLoggerConfig};
pub use naming::{DefaultMetricNamer, MetricNamer};
pub use time_logger::TimeLoggerHook;

/// Errors a hook can raise back to its host.
#[derive(Debug, Error)]
pub enum HookError {
    /// A task ended without a recorded start.
    #[error("task '{metric}' ended without a recorded start")]
    MissingStart { metric: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracking sink error: {0}")]
    Tracking(String),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Identity of one pipeline run, handed to `after_pipeline`.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: String,
    pub pipeline: String,
    pub started_at: DateTime<Local>,
    pub task_count: usize,
}

/// Callbacks raised by a pipeline host.
///
/// Every callback defaults to a no-op so hooks only implement the
/// events they care about. Errors are propagated to the host, which
/// decides whether the run continues.
pub trait Hook {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    fn before_task(&mut self, _task: &Task, _inputs: &DataMap) -> Result<(), HookError> {
        Ok(())
    }

    fn after_task(
        &mut self,
        _task: &Task,
        _inputs: &DataMap,
        _outputs: &DataMap,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_pipeline(&mut self, _run: &RunInfo) -> Result<(), HookError> {
        Ok(())
    }
}
