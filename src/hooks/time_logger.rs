//! Task Time Logger
//!
//! Records when each task starts and ends, logs how long it took and,
//! once the pipeline finishes, writes a Gantt chart of the whole run.
//! Durations and the chart can be forwarded to a tracking sink.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::monitoring::{ChartRenderer, GanttRow, HtmlGanttRenderer, NoopRenderer};
use crate::pipeline::{DataMap, Task};
use crate::tracking::{Metrics, MetricsSink, NoopSink};

use super::clock::{Clock, SystemClock};
use super::config::TimeLoggerConfig;
use super::naming::{DefaultMetricNamer, MetricNamer};
use super::{Hook, HookError, RunInfo};

/// Logs the time each task takes to run.
///
/// State lives in the instance: create one hook per pipeline run.
/// Tasks deriving the same metric name share (and overwrite) entries.
///
/// # Example
///
/// ```rust
/// use nodetime::hooks::{Hook, ManualClock, TimeLoggerConfig, TimeLoggerHook};
/// use nodetime::pipeline::{DataMap, Task};
///
/// let clock = ManualClock::new(0.0);
/// let config = TimeLoggerConfig { enable_gantt: false, ..Default::default() };
/// let mut hook = TimeLoggerHook::new(config)
///     .with_namer(|task: &Task| task.name.clone())
///     .with_clock(clock.clone());
///
/// let task = Task::new("A", "pkg.a");
/// hook.before_task(&task, &DataMap::new()).unwrap();
/// clock.advance(2.0);
/// hook.after_task(&task, &DataMap::new(), &DataMap::new()).unwrap();
///
/// assert_eq!(hook.durations()["A"], 2.0);
/// ```
pub struct TimeLoggerHook {
    config: TimeLoggerConfig,
    gantt_path: PathBuf,
    namer: Box<dyn MetricNamer>,
    clock: Box<dyn Clock>,
    tracker: Box<dyn MetricsSink>,
    renderer: Box<dyn ChartRenderer>,
    time_begin: BTreeMap<String, f64>,
    time_end: BTreeMap<String, f64>,
    durations: BTreeMap<String, f64>,
}

impl TimeLoggerHook {
    /// Creates a hook with the default namer, the system clock, no
    /// tracking sink and, when charts are enabled, the HTML renderer.
    pub fn new(config: TimeLoggerConfig) -> Self {
        let renderer: Box<dyn ChartRenderer> = if config.enable_gantt {
            Box::new(HtmlGanttRenderer::new())
        } else {
            Box::new(NoopRenderer)
        };

        Self {
            gantt_path: config.gantt_path(),
            config,
            namer: Box::new(DefaultMetricNamer),
            clock: Box::new(SystemClock),
            tracker: Box::new(NoopSink),
            renderer,
            time_begin: BTreeMap::new(),
            time_end: BTreeMap::new(),
            durations: BTreeMap::new(),
        }
    }

    /// Installs the tracking sink. Ignored when tracking is disabled.
    pub fn with_tracker(mut self, tracker: impl MetricsSink + 'static) -> Self {
        if self.config.enable_tracking {
            self.tracker = Box::new(tracker);
        } else {
            debug!("Tracking disabled; time logger keeps the no-op sink");
        }
        self
    }

    /// Replaces the chart renderer. Ignored when charts are disabled.
    pub fn with_renderer(mut self, renderer: impl ChartRenderer + 'static) -> Self {
        if self.config.enable_gantt {
            self.renderer = Box::new(renderer);
        } else {
            debug!("Gantt chart disabled; time logger keeps the no-op renderer");
        }
        self
    }

    /// Replaces the metric naming strategy.
    pub fn with_namer(mut self, namer: impl MetricNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &TimeLoggerConfig {
        &self.config
    }

    /// Where the chart is written.
    pub fn gantt_path(&self) -> &Path {
        &self.gantt_path
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn is_charting(&self) -> bool {
        self.renderer.is_active()
    }

    /// Start times in seconds, by metric name.
    pub fn begin_times(&self) -> &BTreeMap<String, f64> {
        &self.time_begin
    }

    /// End times in seconds, by metric name.
    pub fn end_times(&self) -> &BTreeMap<String, f64> {
        &self.time_end
    }

    /// Durations in seconds, by metric name.
    pub fn durations(&self) -> &BTreeMap<String, f64> {
        &self.durations
    }

    /// Builds one chart row per task with both a start and an end,
    /// ordered by start time then name.
    pub fn gantt_rows(&self) -> Vec<GanttRow> {
        let mut rows: Vec<GanttRow> = self
            .time_begin
            .iter()
            .filter_map(|(name, begin)| match self.time_end.get(name) {
                Some(end) => Some(GanttRow::from_seconds(name.clone(), *begin, *end)),
                None => {
                    debug!("No end time for '{}'; left out of the chart", name);
                    None
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            a.start_ms
                .total_cmp(&b.start_ms)
                .then_with(|| a.task.cmp(&b.task))
        });
        rows
    }

    /// Renders the chart and writes it, creating parent directories.
    fn write_gantt(&self) -> Result<(), HookError> {
        let rows = self.gantt_rows();
        let document = self.renderer.render(&rows, &self.config.gantt_params)?;

        if let Some(parent) = self.gantt_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.gantt_path, document)?;
        info!(
            "Gantt chart of {} tasks written to {}",
            rows.len(),
            self.gantt_path.display()
        );

        if self.tracker.is_active() {
            self.tracker.log_artifact(&self.gantt_path)?;
        }

        Ok(())
    }
}

impl Hook for TimeLoggerHook {
    fn name(&self) -> &str {
        "time_logger"
    }

    fn before_task(&mut self, task: &Task, _inputs: &DataMap) -> Result<(), HookError> {
        let name = self.namer.metric_name(task);
        let now = self.clock.now();
        debug!("'{}' started at {:.3}", name, now);
        self.time_begin.insert(name, now);
        Ok(())
    }

    fn after_task(
        &mut self,
        task: &Task,
        _inputs: &DataMap,
        _outputs: &DataMap,
    ) -> Result<(), HookError> {
        let name = self.namer.metric_name(task);
        let end = self.clock.now();
        self.time_end.insert(name.clone(), end);

        let Some(begin) = self.time_begin.get(&name).copied() else {
            warn!("'{}' ended without a recorded start; no duration logged", name);
            return Err(HookError::MissingStart { metric: name });
        };

        let mut metrics = Metrics::new();
        metrics.insert(name.clone(), end - begin);

        info!("Time duration: {:?}", metrics);

        if self.tracker.is_active() {
            self.tracker.log_metrics(&metrics)?;
        }

        self.durations.extend(metrics);
        Ok(())
    }

    fn after_pipeline(&mut self, _run: &RunInfo) -> Result<(), HookError> {
        info!(
            "Time duration: \n{}",
            serde_json::to_string_pretty(&self.durations)?
        );

        if self.renderer.is_active() && !self.time_begin.is_empty() {
            self.write_gantt()?;
        }

        Ok(())
    }
}
