//! Hook Configuration
//!
//! Settings for the bundled hooks, loadable from a YAML hooks file:
//!
//! ```yaml
//! tracking_dir: mlruns
//! time_logger:
//!   enable_tracking: true
//!   enable_gantt: true
//!   gantt_filepath: reports/gantt.html
//!   gantt_params:
//!     title: Training run
//!     height: 400
//! catalog_logger:
//!   auto: true
//!   catalog:
//!     model: json
//!     learning_rate: p
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::monitoring::GanttOptions;

use super::catalog_logger::CatalogEntry;
use super::HookError;

/// Chart path used when none is configured.
pub static DEFAULT_GANTT_PATH: Lazy<PathBuf> =
    Lazy::new(|| std::env::temp_dir().join("_gantt.html"));

fn enabled() -> bool {
    true
}

/// Settings for [`TimeLoggerHook`](super::TimeLoggerHook).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLoggerConfig {
    /// Forward durations and the chart to the tracking sink
    #[serde(default = "enabled")]
    pub enable_tracking: bool,

    /// Render a Gantt chart when the pipeline ends
    #[serde(default = "enabled")]
    pub enable_gantt: bool,

    /// Where the chart is written (defaults to `<tmp>/_gantt.html`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gantt_filepath: Option<PathBuf>,

    /// Options passed through to the chart renderer
    #[serde(default)]
    pub gantt_params: GanttOptions,
}

impl TimeLoggerConfig {
    /// Returns the configured chart path or the default one.
    pub fn gantt_path(&self) -> PathBuf {
        self.gantt_filepath
            .clone()
            .unwrap_or_else(|| DEFAULT_GANTT_PATH.clone())
    }
}

impl Default for TimeLoggerConfig {
    fn default() -> Self {
        Self {
            enable_tracking: true,
            enable_gantt: true,
            gantt_filepath: None,
            gantt_params: GanttOptions::new(),
        }
    }
}

/// Settings for [`CatalogLoggerHook`](super::CatalogLoggerHook).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogLoggerConfig {
    #[serde(default = "enabled")]
    pub enable_tracking: bool,

    /// How individual datasets are logged
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogEntry>,

    /// Log datasets missing from `catalog` by value type
    #[serde(default = "enabled")]
    pub auto: bool,

    /// Where file entries are saved before upload (defaults to the temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
}

impl Default for CatalogLoggerConfig {
    fn default() -> Self {
        Self {
            enable_tracking: true,
            catalog: BTreeMap::new(),
            auto: true,
            artifact_dir: None,
        }
    }
}

/// Top-level hooks file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Root of the local tracking store; tracking is off when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_dir: Option<PathBuf>,

    #[serde(default)]
    pub time_logger: TimeLoggerConfig,

    /// The catalog logger only runs when this section is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_logger: Option<CatalogLoggerConfig>,
}

/// Loads a hooks file.
pub fn load_hooks_config(path: impl AsRef<Path>) -> Result<HooksConfig, HookError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config: HooksConfig = serde_yaml::from_str(&content)?;
    info!("Loaded hooks configuration from {}", path.display());
    Ok(config)
}
