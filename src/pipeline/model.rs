//! Pipeline Data Model
//!
//! Core data structures describing a pipeline run: its tasks, the
//! datasets they exchange and the parameters fed in from outside.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: training
//! parameters:
//!   learning_rate: 0.01
//! tasks:
//!   - name: load
//!     func: data.loaders.load_iris
//!     command: echo '[5.1, 4.9, 4.7]'
//!     outputs: raw
//!
//!   - name: fit
//!     func: models.train.<locals>.fit
//!     command: |
//!       echo '{"model": "svm", "score": 0.93}'
//!     inputs: [raw, learning_rate]
//!     outputs: [model, score]
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values flowing between tasks, keyed by dataset name.
pub type DataMap = BTreeMap<String, Value>;

/// A single unit of work in a pipeline.
///
/// Hooks only consume `func` and `outputs` to identify a task; the
/// remaining fields drive the bundled runner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique name of this task within its pipeline
    pub name: String,

    /// Fully qualified function identity (e.g. `pkg.module.<locals>.fit`)
    pub func: String,

    /// Shell command run by the bundled runner
    #[serde(default)]
    pub command: String,

    /// Dataset names this task reads
    #[serde(deserialize_with = "single_or_vec", default)]
    pub inputs: Vec<String>,

    /// Dataset names this task produces
    #[serde(deserialize_with = "single_or_vec", default)]
    pub outputs: Vec<String>,
}

/// Deserializes either a single string or array of strings into Vec<String>
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(arr) => arr
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(de::Error::custom("Expected string in array")),
            })
            .collect(),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}

impl Task {
    /// Creates a new task with no inputs, outputs or command.
    ///
    /// # Example
    ///
    /// ```
    /// use nodetime::pipeline::Task;
    ///
    /// let task = Task::new("fit", "models.train.fit")
    ///     .with_command("echo 0.93")
    ///     .with_input("features")
    ///     .with_output("score");
    /// assert_eq!(task.outputs, vec!["score"]);
    /// ```
    pub fn new(name: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            func: func.into().trim().to_string(),
            command: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Sets the shell command for this task.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into().trim().to_string();
        self
    }

    /// Appends an input dataset.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Replaces the input datasets.
    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Appends an output dataset.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }

    /// Replaces the output datasets.
    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }
}

/// A named, ordered list of tasks plus the parameters they may read.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pipeline {
    /// Display name of the pipeline
    #[serde(default = "default_name")]
    pub name: String,

    /// Externally supplied datasets available to every task
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: DataMap,

    /// Tasks in execution order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

fn default_name() -> String {
    "__default__".to_string()
}

impl Pipeline {
    /// Creates a new empty pipeline.
    pub fn new() -> Self {
        Self {
            name: default_name(),
            parameters: DataMap::new(),
            tasks: Vec::new(),
        }
    }

    /// Creates a pipeline from a list of tasks.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::new()
        }
    }

    /// Sets the pipeline name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a parameter dataset.
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Adds a task to the pipeline.
    pub fn add_task(&mut self, task: Task) -> Result<(), String> {
        if self.tasks.iter().any(|t| t.name == task.name) {
            return Err(format!("Task '{}' already exists", task.name));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Gets a task by name.
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Returns every dataset name produced by some task.
    pub fn produced_datasets(&self) -> HashSet<&str> {
        self.tasks
            .iter()
            .flat_map(|t| t.outputs.iter().map(String::as_str))
            .collect()
    }

    /// Returns the number of tasks in the pipeline.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the pipeline has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_creation() {
        let task = Task::new(" fit ", "models.fit")
            .with_command("echo 1")
            .with_input("x")
            .with_input("y")
            .with_output("model");

        assert_eq!(task.name, "fit");
        assert_eq!(task.func, "models.fit");
        assert_eq!(task.inputs, vec!["x", "y"]);
        assert_eq!(task.outputs, vec!["model"]);
    }

    #[test]
    fn test_task_single_output_from_yaml() {
        let yaml = "name: t\nfunc: f\noutputs: result\n";
        let task: Task = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.outputs, vec!["result"]);
        assert!(task.inputs.is_empty());
        assert!(task.command.is_empty());
    }

    #[test]
    fn test_task_rejects_non_string_outputs() {
        let yaml = "name: t\nfunc: f\noutputs: [1, 2]\n";
        let result: Result<Task, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_add_duplicate_task() {
        let mut pipeline = Pipeline::new();
        pipeline.add_task(Task::new("a", "f")).unwrap();
        assert!(pipeline.add_task(Task::new("a", "g")).is_err());
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_pipeline_defaults() {
        let pipeline: Pipeline = serde_yaml::from_str("tasks: []").unwrap();
        assert_eq!(pipeline.name, "__default__");
        assert!(pipeline.parameters.is_empty());
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_pipeline_produced_datasets() {
        let pipeline = Pipeline::from_tasks(vec![
            Task::new("a", "f").with_output("x"),
            Task::new("b", "g").with_input("x").with_output("y"),
        ])
        .with_parameter("alpha", json!(0.5));

        let produced = pipeline.produced_datasets();
        assert!(produced.contains("x"));
        assert!(produced.contains("y"));
        assert!(!produced.contains("alpha"));
        assert_eq!(pipeline.get_task("b").unwrap().func, "g");
    }
}
