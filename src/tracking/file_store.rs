//! Local File Tracking Store
//!
//! Stores one run per directory under a root:
//!
//! ```text
//! <root>/<run_id>/
//!   meta.yaml          run id and start time
//!   metrics/<key>      "<timestamp_ms> <value> <step>" per logged value
//!   params/<key>       the parameter value
//!   artifacts/<file>   copies of uploaded files
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hooks::HookError;

use super::{Metrics, MetricsSink, Params};

/// Run metadata written to `meta.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub start_time: DateTime<Local>,
}

/// Tracking sink writing to a run directory.
///
/// Clones write to the same run and share metric step counters.
#[derive(Debug, Clone)]
pub struct FileTrackingSink {
    run_id: String,
    run_dir: PathBuf,
    steps: Arc<Mutex<HashMap<String, u64>>>,
}

impl FileTrackingSink {
    /// Creates a new run directory under `root`.
    pub fn create(root: impl AsRef<Path>) -> Result<Self, HookError> {
        let start_time = Local::now();
        let run_id = start_time.format("%Y%m%d-%H%M%S-%3f").to_string();
        let run_dir = root.as_ref().join(&run_id);

        for sub in ["metrics", "params", "artifacts"] {
            fs::create_dir_all(run_dir.join(sub))?;
        }

        let meta = RunMeta {
            run_id: run_id.clone(),
            start_time,
        };
        fs::write(run_dir.join("meta.yaml"), serde_yaml::to_string(&meta)?)?;

        info!("Tracking run {} in {}", run_id, run_dir.display());

        Ok(Self {
            run_id,
            run_dir,
            steps: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Reads back `meta.yaml`.
    pub fn meta(&self) -> Result<RunMeta, HookError> {
        let content = fs::read_to_string(self.run_dir.join("meta.yaml"))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn next_step(&self, key: &str) -> Result<u64, HookError> {
        let mut steps = self
            .steps
            .lock()
            .map_err(|_| HookError::Tracking("step counter lock poisoned".to_string()))?;
        let step = steps.entry(key.to_string()).or_insert(0);
        let current = *step;
        *step += 1;
        Ok(current)
    }
}

impl MetricsSink for FileTrackingSink {
    fn log_metrics(&self, metrics: &Metrics) -> Result<(), HookError> {
        let timestamp = Utc::now().timestamp_millis();

        for (key, value) in metrics {
            let step = self.next_step(key)?;
            let path = self.run_dir.join("metrics").join(file_key(key));
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{} {} {}", timestamp, value, step)?;
            debug!("Logged metric '{}' = {} (step {})", key, value, step);
        }

        Ok(())
    }

    fn log_params(&self, params: &Params) -> Result<(), HookError> {
        for (key, value) in params {
            fs::write(self.run_dir.join("params").join(file_key(key)), value)?;
            debug!("Logged param '{}'", key);
        }
        Ok(())
    }

    fn log_artifact(&self, path: &Path) -> Result<(), HookError> {
        let file_name = path.file_name().ok_or_else(|| {
            HookError::Tracking(format!("artifact path has no file name: {}", path.display()))
        })?;

        let target = self.run_dir.join("artifacts").join(file_name);
        fs::copy(path, &target)?;
        info!("Logged artifact {}", target.display());
        Ok(())
    }
}

/// Longest file name, in bytes, produced by [`file_key`].
const MAX_KEY_BYTES: usize = 200;

/// Hex digits of the key digest kept in shortened file names.
const DIGEST_CHARS: usize = 16;

/// Makes a metric or parameter key usable as a file name.
///
/// Keys longer than [`MAX_KEY_BYTES`] are cut on a char boundary and
/// suffixed with a digest of the full key, so distinct keys stay distinct.
pub(crate) fn file_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();

    let cleaned = match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    };

    if cleaned.len() <= MAX_KEY_BYTES {
        return cleaned;
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    let mut cut = MAX_KEY_BYTES - DIGEST_CHARS - 1;
    while !cleaned.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}~{}", &cleaned[..cut], &digest[..DIGEST_CHARS])
}
