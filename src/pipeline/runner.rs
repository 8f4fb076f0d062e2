//! Sequential Pipeline Runner
//!
//! A minimal host that executes tasks in declared order and raises
//! the lifecycle callbacks every [`Hook`] listens to:
//! - `before_task` right before a task's command starts
//! - `after_task` once its outputs are stored
//! - `after_pipeline` once, after the last task

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use log::{error, info};
use serde_json::Value;

use crate::hooks::{Hook, RunInfo};

use super::model::{DataMap, Pipeline, Task};
use super::step::execute_task;
use super::validator::validate_pipeline;
use super::PipelineError;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identity of the run as seen by hooks
    pub run: RunInfo,
    /// Every dataset known at the end of the run, parameters included
    pub datasets: DataMap,
    /// Wall-clock time spent in `run`
    pub elapsed: Duration,
}

/// Runs a pipeline's tasks one after another.
///
/// # Example
///
/// ```rust,no_run
/// use nodetime::hooks::{TimeLoggerConfig, TimeLoggerHook};
/// use nodetime::pipeline::{load_pipeline, Runner};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = load_pipeline("pipeline.yaml")?;
///     let mut timer = TimeLoggerHook::new(TimeLoggerConfig::default());
///
///     let mut runner = Runner::new();
///     runner.set_working_dir("/data/project");
///     runner.run(&pipeline, &mut [&mut timer])?;
///
///     println!("{:?}", timer.durations());
///     Ok(())
/// }
/// ```
pub struct Runner {
    working_dir: Option<PathBuf>,
    dry_run: bool,
}

impl Runner {
    /// Creates a runner executing in the current directory.
    pub fn new() -> Self {
        Self {
            working_dir: None,
            dry_run: false,
        }
    }

    /// Sets the working directory for task commands.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = Some(dir.into());
    }

    /// Enables or disables dry run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Executes the pipeline, notifying `hooks` in the order given.
    ///
    /// The first failing task or hook aborts the run; `after_pipeline`
    /// is only raised when every task succeeded.
    pub fn run(
        &self,
        pipeline: &Pipeline,
        hooks: &mut [&mut dyn Hook],
    ) -> Result<RunSummary, PipelineError> {
        let start_time = Instant::now();

        validate_pipeline(pipeline).map_err(PipelineError::Invalid)?;

        let started_at = Local::now();
        let run = RunInfo {
            run_id: started_at.format("%Y%m%d-%H%M%S-%3f").to_string(),
            pipeline: pipeline.name.clone(),
            started_at,
            task_count: pipeline.len(),
        };

        info!(
            "Starting run {} of '{}' ({} tasks, {} hooks, dry run: {})",
            run.run_id,
            run.pipeline,
            run.task_count,
            hooks.len(),
            self.dry_run
        );

        let mut datasets = pipeline.parameters.clone();

        for task in &pipeline.tasks {
            let inputs: DataMap = task
                .inputs
                .iter()
                .map(|name| {
                    let value = datasets.get(name).cloned().unwrap_or(Value::Null);
                    (name.clone(), value)
                })
                .collect();

            info!("Starting task: {}", task.name);
            for hook in hooks.iter_mut() {
                hook.before_task(task, &inputs)
                    .map_err(|source| hook_error(&**hook, source))?;
            }

            let outputs = if self.dry_run {
                self.preview(task, &inputs)
            } else {
                execute_task(task, &inputs, self.working_dir.as_deref()).map_err(|e| {
                    error!("Task '{}' failed: {}", task.name, e);
                    e
                })?
            };

            for hook in hooks.iter_mut() {
                hook.after_task(task, &inputs, &outputs)
                    .map_err(|source| hook_error(&**hook, source))?;
            }

            info!("Task '{}' completed successfully", task.name);
            datasets.extend(outputs);
        }

        for hook in hooks.iter_mut() {
            hook.after_pipeline(&run)
                .map_err(|source| hook_error(&**hook, source))?;
        }

        let elapsed = start_time.elapsed();
        info!("Run {} finished in {:.2?}", run.run_id, elapsed);

        Ok(RunSummary {
            run,
            datasets,
            elapsed,
        })
    }

    /// Prints what a task would do and yields `null` outputs.
    fn preview(&self, task: &Task, inputs: &DataMap) -> DataMap {
        println!();
        println!("[DRY RUN] Task: {}", task.name);
        println!("  Func: {}", task.func);
        println!("  Command: {}", task.command);
        println!("  Inputs: {:?}", inputs.keys().collect::<Vec<_>>());
        println!("  Outputs: {:?}", task.outputs);

        task.outputs
            .iter()
            .map(|name| (name.clone(), Value::Null))
            .collect()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn hook_error(hook: &dyn Hook, source: crate::hooks::HookError) -> PipelineError {
    error!("Hook '{}' failed: {}", hook.name(), source);
    PipelineError::Hook {
        hook: hook.name().to_string(),
        source,
    }
}
