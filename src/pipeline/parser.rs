//! Pipeline Parser
//!
//! Loads pipeline definitions from YAML files and validates them
//! before they reach the runner.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::model::Pipeline;
use super::validator::validate_pipeline;
use super::PipelineError;

/// Parses and validates a pipeline from YAML text.
pub fn parse_pipeline(yaml_content: &str) -> Result<Pipeline, PipelineError> {
    let pipeline: Pipeline = serde_yaml::from_str(yaml_content)?;

    info!(
        "Parsed pipeline '{}': {} tasks, {} parameters",
        pipeline.name,
        pipeline.tasks.len(),
        pipeline.parameters.len()
    );

    validate_pipeline(&pipeline).map_err(PipelineError::Invalid)?;

    Ok(pipeline)
}

/// Loads a pipeline from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use nodetime::pipeline::load_pipeline;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = load_pipeline("pipeline.yaml")?;
///     println!("Loaded {} tasks", pipeline.tasks.len());
///     Ok(())
/// }
/// ```
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline, PipelineError> {
    let path = path.as_ref();
    info!("Loading pipeline from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.display().to_string(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    parse_pipeline(&yaml_content)
}

/// Saves a pipeline to a YAML file.
pub fn save_pipeline(pipeline: &Pipeline, path: impl AsRef<Path>) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let yaml_content = serde_yaml::to_string(pipeline)?;
    fs::write(path, yaml_content).map_err(|source| PipelineError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!("Pipeline saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Task;
    use tempfile::tempdir;

    const VALID_YAML: &str = r#"
name: demo
parameters:
  rate: 0.5
tasks:
  - name: load
    func: data.load
    command: echo 3
    outputs: raw
  - name: fit
    func: models.<locals>.fit
    command: |
      echo '{"model": "m", "score": 0.9}'
    inputs: [raw, rate]
    outputs: [model, score]
"#;

    #[test]
    fn test_parse_valid_pipeline() {
        let pipeline = parse_pipeline(VALID_YAML).unwrap();
        assert_eq!(pipeline.name, "demo");
        assert_eq!(pipeline.tasks.len(), 2);
        assert_eq!(pipeline.tasks[1].outputs, vec!["model", "score"]);
        assert_eq!(pipeline.parameters["rate"], serde_json::json!(0.5));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_pipeline("this is not valid yaml: [[[");
        assert!(matches!(result, Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        let yaml = r#"
tasks:
  - name: fit
    func: f
    command: echo 1
    inputs: missing
"#;
        let result = parse_pipeline(yaml);
        assert!(matches!(result, Err(PipelineError::Invalid(_))));
    }

    #[test]
    fn test_load_pipeline_file_not_found() {
        let result = load_pipeline("/nonexistent/path/pipeline.yaml");
        assert!(matches!(result, Err(PipelineError::Read { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("pipeline.yaml");

        let pipeline = Pipeline::from_tasks(vec![Task::new("a", "pkg.a")
            .with_command("echo 1")
            .with_output("x")])
        .with_name("saved");

        save_pipeline(&pipeline, &path).unwrap();
        let loaded = load_pipeline(&path).unwrap();

        assert_eq!(loaded.name, "saved");
        assert_eq!(loaded.tasks, pipeline.tasks);
    }
}
