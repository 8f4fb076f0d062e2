//! Pipeline Definition and Runner
//!
//! A small host for the lifecycle hooks: pipeline definitions loaded
//! from YAML and a sequential runner that raises the hook callbacks.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Task, Pipeline)
//! - [`parser`]: YAML parsing and loading
//! - [`validator`]: Validation rules
//! - [`step`]: Execution of a single task
//! - [`runner`]: Sequential execution with hook callbacks

pub mod model;
pub mod parser;
pub mod runner;
pub mod step;
pub mod validator;

use thiserror::Error;

use crate::hooks::HookError;

pub use model::{DataMap, Pipeline, Task};
pub use parser::{load_pipeline, parse_pipeline, save_pipeline};
pub use runner::{RunSummary, Runner};
pub use validator::{validate_pipeline, ValidationError};

/// Errors raised while loading or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read pipeline file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write pipeline file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pipeline: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("failed to launch task '{task}': {source}")]
    Launch {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}' failed with exit code {code:?}")]
    TaskFailed { task: String, code: Option<i32> },

    #[error("hook '{hook}' failed: {source}")]
    Hook {
        hook: String,
        #[source]
        source: HookError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
