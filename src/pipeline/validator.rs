//! Pipeline Validation
//!
//! Checks a pipeline before it runs:
//! - Task field validation
//! - Unique task names and single producers per dataset
//! - Every input is available by the time its task runs

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use super::model::{Pipeline, Task};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyPipeline,
    EmptyTaskName,
    DuplicateTaskName(String),
    EmptyFunc(String),
    EmptyCommand(String),
    UnknownInput { task: String, input: String },
    DuplicateOutput { output: String, first: String, second: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPipeline => write!(f, "Pipeline has no tasks"),
            Self::EmptyTaskName => write!(f, "Task has empty or whitespace-only name"),
            Self::DuplicateTaskName(name) => write!(f, "Duplicate task name: '{}'", name),
            Self::EmptyFunc(task) => write!(f, "Task '{}' has no func specified", task),
            Self::EmptyCommand(task) => write!(f, "Task '{}' has no command specified", task),
            Self::UnknownInput { task, input } => write!(
                f,
                "Task '{}' reads '{}' which is neither a parameter nor produced by an earlier task",
                task, input
            ),
            Self::DuplicateOutput {
                output,
                first,
                second,
            } => write!(
                f,
                "Dataset '{}' is produced by both '{}' and '{}'",
                output, first, second
            ),
        }
    }
}

/// Validates a single task's fields.
fn validate_task(task: &Task) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if task.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTaskName);
        return errors;
    }

    if task.func.trim().is_empty() {
        errors.push(ValidationError::EmptyFunc(task.name.clone()));
    }

    if task.command.trim().is_empty() {
        errors.push(ValidationError::EmptyCommand(task.name.clone()));
    }

    errors
}

/// Validates a pipeline, collecting every problem found.
///
/// Tasks run in declared order, so an input must be a parameter or
/// an output of a task listed before the reader.
pub fn validate_pipeline(pipeline: &Pipeline) -> Result<(), Vec<ValidationError>> {
    if pipeline.is_empty() {
        return Err(vec![ValidationError::EmptyPipeline]);
    }

    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut producers: HashMap<&str, &str> = HashMap::new();
    let mut available: HashSet<&str> = pipeline.parameters.keys().map(String::as_str).collect();

    for task in &pipeline.tasks {
        errors.extend(validate_task(task));

        if !task.name.trim().is_empty() && !names.insert(task.name.as_str()) {
            errors.push(ValidationError::DuplicateTaskName(task.name.clone()));
        }

        for input in &task.inputs {
            if !available.contains(input.as_str()) {
                errors.push(ValidationError::UnknownInput {
                    task: task.name.clone(),
                    input: input.clone(),
                });
            }
        }

        for output in &task.outputs {
            if let Some(first) = producers.insert(output.as_str(), task.name.as_str()) {
                errors.push(ValidationError::DuplicateOutput {
                    output: output.clone(),
                    first: first.to_string(),
                    second: task.name.clone(),
                });
            }
            available.insert(output.as_str());
        }

        debug!("Task '{}' validated", task.name);
    }

    if errors.is_empty() {
        info!("Pipeline '{}' validated: {} tasks", pipeline.name, pipeline.len());
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(name: &str) -> Task {
        Task::new(name, format!("pkg.{}", name)).with_command("echo 1")
    }

    #[test]
    fn test_valid_pipeline() {
        let pipeline = Pipeline::from_tasks(vec![
            task("a").with_input("alpha").with_output("x"),
            task("b").with_input("x").with_output("y"),
        ])
        .with_parameter("alpha", json!(1));

        assert!(validate_pipeline(&pipeline).is_ok());
    }

    #[test]
    fn test_empty_pipeline() {
        let errors = validate_pipeline(&Pipeline::new()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyPipeline]);
    }

    #[test]
    fn test_input_declared_after_reader() {
        let pipeline = Pipeline::from_tasks(vec![
            task("b").with_input("x"),
            task("a").with_output("x"),
        ]);

        let errors = validate_pipeline(&pipeline).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownInput {
                task: "b".to_string(),
                input: "x".to_string()
            }]
        );
    }

    #[test]
    fn test_duplicate_names_and_outputs() {
        let pipeline = Pipeline::from_tasks(vec![
            task("a").with_output("x"),
            task("a").with_output("x"),
        ]);

        let errors = validate_pipeline(&pipeline).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateTaskName("a".to_string())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateOutput { .. })));
    }

    #[test]
    fn test_missing_fields_collected() {
        let pipeline = Pipeline::from_tasks(vec![Task::new("a", ""), Task::new("", "f")]);

        let errors = validate_pipeline(&pipeline).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyFunc("a".to_string())));
        assert!(errors.contains(&ValidationError::EmptyCommand("a".to_string())));
        assert!(errors.contains(&ValidationError::EmptyTaskName));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::DuplicateOutput {
            output: "x".to_string(),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        assert_eq!(err.to_string(), "Dataset 'x' is produced by both 'a' and 'b'");
    }
}
