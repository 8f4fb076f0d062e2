//! Individual Task Execution
//!
//! Handles the execution of a single pipeline task including:
//! - Placeholder substitution
//! - Script generation
//! - Passing input values through the environment
//! - Turning stdout into output values

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, error, warn};
use serde_json::Value;

use super::model::{DataMap, Task};
use super::PipelineError;

/// Prefix of the environment variables carrying input values.
pub const INPUT_ENV_PREFIX: &str = "NODETIME_IN_";

/// Executes a single task and returns the values of its outputs.
///
/// The following placeholders are substituted in the command:
/// - `{inputs}` / `{input}` - Space-separated input dataset names
/// - `{outputs}` / `{output}` - Space-separated output dataset names
///
/// Every input value is exported as `NODETIME_IN_<NAME>`; strings are
/// passed verbatim, everything else as JSON.
pub fn execute_task(
    task: &Task,
    inputs: &DataMap,
    working_dir: Option<&Path>,
) -> Result<DataMap, PipelineError> {
    let inputs_str = task.inputs.join(" ");
    let outputs_str = task.outputs.join(" ");

    let command_text = task
        .command
        .replace("{inputs}", &inputs_str)
        .replace("{input}", &inputs_str)
        .replace("{outputs}", &outputs_str)
        .replace("{output}", &outputs_str);

    let script_path =
        create_execution_script(&task.name, &command_text).map_err(|source| {
            PipelineError::Launch {
                task: task.name.clone(),
                source,
            }
        })?;

    let mut cmd = Command::new("bash");
    cmd.arg(&script_path);

    for (name, value) in inputs {
        cmd.env(input_env_name(name), env_value(value));
    }

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
        debug!("Executing in directory: {}", dir.display());
    }

    let output = cmd.output().map_err(|source| PipelineError::Launch {
        task: task.name.clone(),
        source,
    });

    if let Err(e) = fs::remove_file(&script_path) {
        warn!("Failed to clean up script {}: {}", script_path.display(), e);
    }

    let output = output?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    if output.status.success() {
        debug!("Task '{}' completed successfully", task.name);
        if !stdout.trim().is_empty() {
            debug!("Task '{}' output:\n{}", task.name, stdout);
        }
        Ok(parse_outputs(task, &stdout))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);

        error!(
            "Task '{}' failed with exit code: {:?}",
            task.name,
            output.status.code()
        );

        if !stderr.trim().is_empty() {
            error!("stderr:\n{}", stderr);
        }
        if !stdout.trim().is_empty() {
            debug!("stdout:\n{}", stdout);
        }

        Err(PipelineError::TaskFailed {
            task: task.name.clone(),
            code: output.status.code(),
        })
    }
}

/// Maps captured stdout onto the task's declared outputs.
///
/// A single output takes the whole of stdout (JSON when it parses,
/// a trimmed string otherwise). Several outputs require a JSON object;
/// keys it lacks become `null`.
pub fn parse_outputs(task: &Task, stdout: &str) -> DataMap {
    let mut values = DataMap::new();

    match task.outputs.as_slice() {
        [] => {}
        [single] => {
            values.insert(single.clone(), parse_value(stdout));
        }
        many => {
            let mut object = match parse_value(stdout) {
                Value::Object(map) => map,
                _ => {
                    warn!(
                        "Task '{}' declares {} outputs but did not print a JSON object",
                        task.name,
                        many.len()
                    );
                    serde_json::Map::new()
                }
            };
            for name in many {
                values.insert(name.clone(), object.remove(name).unwrap_or(Value::Null));
            }
        }
    }

    values
}

/// Parses one value from command output.
fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Builds the environment variable name for an input dataset.
fn input_env_name(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", INPUT_ENV_PREFIX, suffix)
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Creates a temporary bash script for task execution.
fn create_execution_script(task_name: &str, command_text: &str) -> std::io::Result<PathBuf> {
    let script_dir = std::env::temp_dir().join("nodetime_scripts");
    fs::create_dir_all(&script_dir)?;

    let safe_name: String = task_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let script_path = script_dir.join(format!("task_{}_{}.sh", safe_name, std::process::id()));
    let mut file = File::create(&script_path)?;

    writeln!(file, "#!/bin/bash")?;
    writeln!(file, "set -e")?;
    writeln!(file, "{}", command_text)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(script_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_outputs_single_json() {
        let task = Task::new("t", "f").with_output("score");
        let values = parse_outputs(&task, "0.93\n");
        assert_eq!(values["score"], json!(0.93));
    }

    #[test]
    fn test_parse_outputs_single_plain_text() {
        let task = Task::new("t", "f").with_output("label");
        let values = parse_outputs(&task, "  hello world \n");
        assert_eq!(values["label"], json!("hello world"));
    }

    #[test]
    fn test_parse_outputs_empty_stdout() {
        let task = Task::new("t", "f").with_output("x");
        assert_eq!(parse_outputs(&task, "")["x"], Value::Null);
    }

    #[test]
    fn test_parse_outputs_multiple() {
        let task = Task::new("t", "f").with_output("a").with_output("b");
        let values = parse_outputs(&task, r#"{"a": [1, 2], "c": 3}"#);
        assert_eq!(values["a"], json!([1, 2]));
        assert_eq!(values["b"], Value::Null);
        assert!(!values.contains_key("c"));
    }

    #[test]
    fn test_parse_outputs_multiple_not_object() {
        let task = Task::new("t", "f").with_output("a").with_output("b");
        let values = parse_outputs(&task, "plain");
        assert_eq!(values.len(), 2);
        assert!(values.values().all(Value::is_null));
    }

    #[test]
    fn test_input_env_name() {
        assert_eq!(input_env_name("raw-data.v2"), "NODETIME_IN_RAW_DATA_V2");
    }

    #[test]
    fn test_create_execution_script() {
        let script_path = create_execution_script("my task", "echo 'hello world'").unwrap();
        assert!(script_path.exists());

        let content = fs::read_to_string(&script_path).unwrap();
        assert!(content.contains("#!/bin/bash"));
        assert!(content.contains("set -e"));
        assert!(content.contains("echo 'hello world'"));

        fs::remove_file(script_path).unwrap();
    }

    #[test]
    fn test_execute_task_reads_inputs_from_env() {
        let task = Task::new("double", "math.double")
            .with_command("echo $(( NODETIME_IN_X * 2 ))")
            .with_input("x")
            .with_output("y");

        let mut inputs = DataMap::new();
        inputs.insert("x".to_string(), json!(21));

        let outputs = execute_task(&task, &inputs, None).unwrap();
        assert_eq!(outputs["y"], json!(42));
    }

    #[test]
    fn test_execute_task_substitutes_placeholders() {
        let task = Task::new("names", "f")
            .with_command("echo \"{outputs}\"")
            .with_output("first");

        let outputs = execute_task(&task, &DataMap::new(), None).unwrap();
        assert_eq!(outputs["first"], json!("first"));
    }

    #[test]
    fn test_execute_task_failure() {
        let task = Task::new("boom", "f").with_command("exit 3");
        let result = execute_task(&task, &DataMap::new(), None);

        match result {
            Err(PipelineError::TaskFailed { task, code }) => {
                assert_eq!(task, "boom");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_execute_task_in_working_dir() {
        use tempfile::tempdir;

        let temp_dir = tempdir().unwrap();
        let task = Task::new("touch", "f").with_command("echo hi > marker.txt");

        execute_task(&task, &DataMap::new(), Some(temp_dir.path())).unwrap();
        assert!(temp_dir.path().join("marker.txt").exists());
    }
}
