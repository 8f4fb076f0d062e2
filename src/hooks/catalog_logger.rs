//! Dataset Catalog Logger
//!
//! Logs the datasets flowing through a pipeline to the tracking sink.
//! Each dataset is logged once per hook instance, the first time it is
//! seen as a task input or output.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::{DataMap, Task};
use crate::tracking::file_store::file_key;
use crate::tracking::{Metrics, MetricsSink, NoopSink, Params};

use super::config::CatalogLoggerConfig;
use super::{Hook, HookError};

/// File formats a dataset can be saved as before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
    Text,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Text => "txt",
        }
    }

    /// Serializes a value in this format.
    pub fn encode(&self, value: &Value) -> Result<String, HookError> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Text => Ok(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }
}

/// How one dataset is logged.
///
/// Written in configuration as `param` (`p`, `$`), `metric` (`m`, `#`)
/// or a file extension (`json`, `yaml`, `yml`, `txt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CatalogEntry {
    Param,
    Metric,
    File(FileFormat),
    Unsupported(String),
}

impl From<String> for CatalogEntry {
    fn from(value: String) -> Self {
        match value.as_str() {
            "param" | "p" | "$" => Self::Param,
            "metric" | "m" | "#" => Self::Metric,
            "json" => Self::File(FileFormat::Json),
            "yaml" | "yml" => Self::File(FileFormat::Yaml),
            "txt" => Self::File(FileFormat::Text),
            _ => Self::Unsupported(value),
        }
    }
}

impl From<CatalogEntry> for String {
    fn from(entry: CatalogEntry) -> Self {
        match entry {
            CatalogEntry::Param => "param".to_string(),
            CatalogEntry::Metric => "metric".to_string(),
            CatalogEntry::File(format) => format.extension().to_string(),
            CatalogEntry::Unsupported(raw) => raw,
        }
    }
}

/// Logs task inputs and outputs as params, metrics or artifacts.
///
/// Datasets listed in the catalog are logged as configured. With
/// `auto` on, the rest are logged by type: numbers and booleans as
/// metrics; strings, arrays and objects as params.
pub struct CatalogLoggerHook {
    config: CatalogLoggerConfig,
    tracker: Box<dyn MetricsSink>,
    logged: HashSet<String>,
}

impl CatalogLoggerHook {
    pub fn new(config: CatalogLoggerConfig) -> Self {
        Self {
            config,
            tracker: Box::new(NoopSink),
            logged: HashSet::new(),
        }
    }

    /// Installs the tracking sink. Ignored when tracking is disabled.
    pub fn with_tracker(mut self, tracker: impl MetricsSink + 'static) -> Self {
        if self.config.enable_tracking {
            self.tracker = Box::new(tracker);
        }
        self
    }

    /// Dataset names logged so far.
    pub fn logged(&self) -> &HashSet<String> {
        &self.logged
    }

    fn artifact_dir(&self) -> PathBuf {
        self.config
            .artifact_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    fn log_dataset(&self, name: &str, value: &Value) -> Result<(), HookError> {
        let Some(entry) = self.config.catalog.get(name) else {
            if !self.config.auto {
                return Ok(());
            }
            return match value {
                Value::Number(_) | Value::Bool(_) => self.log_metric(name, value),
                Value::String(_) | Value::Array(_) | Value::Object(_) => {
                    self.log_param(name, value)
                }
                Value::Null => {
                    debug!("Dataset '{}' is null; not logged", name);
                    Ok(())
                }
            };
        };

        match entry {
            CatalogEntry::Param => self.log_param(name, value),
            CatalogEntry::Metric => self.log_metric(name, value),
            CatalogEntry::File(format) => self.log_file(name, value, *format),
            CatalogEntry::Unsupported(raw) => {
                warn!(
                    "'{}' is not supported as a catalog entry; '{}' ignored",
                    raw, name
                );
                Ok(())
            }
        }
    }

    fn log_param(&self, name: &str, value: &Value) -> Result<(), HookError> {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut params = Params::new();
        params.insert(name.to_string(), rendered);
        self.tracker.log_params(&params)
    }

    fn log_metric(&self, name: &str, value: &Value) -> Result<(), HookError> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };

        match number.filter(|n| n.is_finite()) {
            Some(number) => {
                let mut metrics = Metrics::new();
                metrics.insert(name.to_string(), number);
                self.tracker.log_metrics(&metrics)
            }
            None => {
                warn!("Dataset '{}' is not a finite number; metric skipped", name);
                Ok(())
            }
        }
    }

    fn log_file(&self, name: &str, value: &Value, format: FileFormat) -> Result<(), HookError> {
        let dir = self.artifact_dir();
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.{}", file_key(name), format.extension()));
        fs::write(&path, format.encode(value)?)?;
        info!("Saved dataset '{}' to {}", name, path.display());

        self.tracker.log_artifact(&path)
    }
}

impl Hook for CatalogLoggerHook {
    fn name(&self) -> &str {
        "catalog_logger"
    }

    fn after_task(
        &mut self,
        _task: &Task,
        inputs: &DataMap,
        outputs: &DataMap,
    ) -> Result<(), HookError> {
        if !self.tracker.is_active() {
            return Ok(());
        }

        for (name, value) in inputs.iter().chain(outputs.iter()) {
            if self.logged.insert(name.clone()) {
                self.log_dataset(name, value)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RecordingSink;
    use serde_json::json;
    use tempfile::tempdir;

    fn data(pairs: &[(&str, Value)]) -> DataMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn task() -> Task {
        Task::new("t", "pkg.t")
    }

    #[test]
    fn test_catalog_entry_parsing() {
        assert_eq!(CatalogEntry::from("p".to_string()), CatalogEntry::Param);
        assert_eq!(CatalogEntry::from("$".to_string()), CatalogEntry::Param);
        assert_eq!(CatalogEntry::from("#".to_string()), CatalogEntry::Metric);
        assert_eq!(
            CatalogEntry::from("yml".to_string()),
            CatalogEntry::File(FileFormat::Yaml)
        );
        assert_eq!(
            CatalogEntry::from("parquet".to_string()),
            CatalogEntry::Unsupported("parquet".to_string())
        );
    }

    #[test]
    fn test_catalog_entry_yaml_round_trip() {
        let entry: CatalogEntry = serde_yaml::from_str("m").unwrap();
        assert_eq!(entry, CatalogEntry::Metric);
        assert_eq!(serde_yaml::to_string(&entry).unwrap().trim(), "metric");
    }

    #[test]
    fn test_auto_logging_by_type() {
        let sink = RecordingSink::new();
        let mut hook = CatalogLoggerHook::new(CatalogLoggerConfig::default())
            .with_tracker(sink.clone());

        let inputs = data(&[("rate", json!(0.5)), ("flag", json!(true))]);
        let outputs = data(&[
            ("label", json!("svm")),
            ("layers", json!([8, 4])),
            ("nothing", Value::Null),
        ]);
        hook.after_task(&task(), &inputs, &outputs).unwrap();

        let metrics = sink.metrics();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().any(|m| m.get("rate") == Some(&0.5)));
        assert!(metrics.iter().any(|m| m.get("flag") == Some(&1.0)));

        let params = sink.params();
        assert!(params.iter().any(|p| p.get("label").map(String::as_str) == Some("svm")));
        assert!(params.iter().any(|p| p.get("layers").map(String::as_str) == Some("[8,4]")));
        assert_eq!(hook.logged().len(), 5);
    }

    #[test]
    fn test_each_dataset_logged_once() {
        let sink = RecordingSink::new();
        let mut hook = CatalogLoggerHook::new(CatalogLoggerConfig::default())
            .with_tracker(sink.clone());

        let shared = data(&[("score", json!(0.9))]);
        hook.after_task(&task(), &DataMap::new(), &shared).unwrap();
        hook.after_task(&task(), &shared, &DataMap::new()).unwrap();

        assert_eq!(sink.metrics().len(), 1);
    }

    #[test]
    fn test_auto_off_skips_unlisted() {
        let sink = RecordingSink::new();
        let config = CatalogLoggerConfig {
            auto: false,
            ..CatalogLoggerConfig::default()
        };
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        hook.after_task(&task(), &data(&[("x", json!(1))]), &DataMap::new())
            .unwrap();

        assert_eq!(sink.call_count(), 0);
    }

    #[test]
    fn test_catalog_overrides_type() {
        let sink = RecordingSink::new();
        let mut config = CatalogLoggerConfig::default();
        config.catalog.insert("epochs".to_string(), CatalogEntry::Param);
        config.catalog.insert("name".to_string(), CatalogEntry::Metric);
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        let outputs = data(&[("epochs", json!(10)), ("name", json!("not a number"))]);
        hook.after_task(&task(), &DataMap::new(), &outputs).unwrap();

        assert_eq!(sink.params().len(), 1);
        assert_eq!(sink.params()[0]["epochs"], "10");
        assert!(sink.metrics().is_empty());
    }

    #[test]
    fn test_file_entry_saved_and_uploaded() {
        let temp_dir = tempdir().unwrap();
        let sink = RecordingSink::new();
        let mut config = CatalogLoggerConfig {
            artifact_dir: Some(temp_dir.path().join("artifacts")),
            ..CatalogLoggerConfig::default()
        };
        config
            .catalog
            .insert("model".to_string(), CatalogEntry::File(FileFormat::Json));
        config
            .catalog
            .insert("notes".to_string(), CatalogEntry::File(FileFormat::Text));
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        let outputs = data(&[("model", json!({"kind": "svm"})), ("notes", json!("ok"))]);
        hook.after_task(&task(), &DataMap::new(), &outputs).unwrap();

        let model_path = temp_dir.path().join("artifacts/model.json");
        let saved: Value = serde_json::from_str(&fs::read_to_string(&model_path).unwrap()).unwrap();
        assert_eq!(saved, json!({"kind": "svm"}));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("artifacts/notes.txt")).unwrap(),
            "ok"
        );
        assert_eq!(sink.artifacts().len(), 2);
        assert!(sink.artifacts().contains(&model_path));
    }

    #[test]
    fn test_file_entry_stays_in_artifact_dir() {
        let temp_dir = tempdir().unwrap();
        let artifact_dir = temp_dir.path().join("artifacts");
        let sink = RecordingSink::new();
        let mut config = CatalogLoggerConfig {
            artifact_dir: Some(artifact_dir.clone()),
            ..CatalogLoggerConfig::default()
        };
        config
            .catalog
            .insert("../escaped".to_string(), CatalogEntry::File(FileFormat::Text));
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        hook.after_task(&task(), &DataMap::new(), &data(&[("../escaped", json!("x"))]))
            .unwrap();

        assert!(!temp_dir.path().join("escaped.txt").exists());
        let saved = artifact_dir.join(".._escaped.txt");
        assert_eq!(fs::read_to_string(&saved).unwrap(), "x");
        assert_eq!(sink.artifacts(), vec![saved]);
    }

    #[test]
    fn test_unsupported_entry_ignored() {
        let sink = RecordingSink::new();
        let mut config = CatalogLoggerConfig::default();
        config.catalog.insert(
            "table".to_string(),
            CatalogEntry::Unsupported("parquet".to_string()),
        );
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        hook.after_task(&task(), &DataMap::new(), &data(&[("table", json!([1]))]))
            .unwrap();

        assert_eq!(sink.call_count(), 0);
        assert!(hook.logged().contains("table"));
    }

    #[test]
    fn test_inactive_without_tracker() {
        let mut hook = CatalogLoggerHook::new(CatalogLoggerConfig::default());
        hook.after_task(&task(), &data(&[("x", json!(1))]), &DataMap::new())
            .unwrap();
        assert!(hook.logged().is_empty());
    }

    #[test]
    fn test_tracking_disabled_ignores_sink() {
        let sink = RecordingSink::new();
        let config = CatalogLoggerConfig {
            enable_tracking: false,
            ..CatalogLoggerConfig::default()
        };
        let mut hook = CatalogLoggerHook::new(config).with_tracker(sink.clone());

        hook.after_task(&task(), &data(&[("x", json!(1))]), &DataMap::new())
            .unwrap();
        assert_eq!(sink.call_count(), 0);
    }
}
