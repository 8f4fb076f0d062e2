//! NodeTime - Task Timing Hooks for Data Pipelines
//!
//! Observers that plug into a pipeline host's lifecycle callbacks to
//! time every task, render the run as a Gantt chart and forward
//! durations and datasets to an experiment tracking store.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`hooks`]: The lifecycle `Hook` trait and the bundled hooks
//! - [`monitoring`]: Gantt chart rows and renderers
//! - [`tracking`]: Sinks receiving metrics, params and artifacts
//! - [`pipeline`]: Pipeline definitions and a sequential host runner
//!
//! # Example
//!
//! ```rust,no_run
//! use nodetime::hooks::{TimeLoggerConfig, TimeLoggerHook};
//! use nodetime::pipeline::{load_pipeline, Runner};
//! use nodetime::tracking::FileTrackingSink;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = load_pipeline("pipeline.yaml")?;
//!
//!     let mut timer = TimeLoggerHook::new(TimeLoggerConfig::default())
//!         .with_tracker(FileTrackingSink::create("runs")?);
//!
//!     Runner::new().run(&pipeline, &mut [&mut timer])?;
//!     Ok(())
//! }
//! ```

pub mod hooks;
pub mod monitoring;
pub mod pipeline;
pub mod tracking;

// Re-export commonly used types
pub use hooks::{CatalogLoggerHook, Hook, HookError, TimeLoggerConfig, TimeLoggerHook};
pub use pipeline::{load_pipeline, Pipeline, Runner, Task};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "NodeTime";
