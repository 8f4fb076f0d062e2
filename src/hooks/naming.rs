//! Metric Name Derivation
//!
//! Turns a task into the string key that correlates its start and end
//! timestamps and names its reported duration. Two tasks deriving the
//! same name within one run overwrite each other's entries.

use crate::pipeline::Task;

/// Longest function-name part kept in a default metric name.
pub const MAX_FUNC_NAME_LEN: usize = 250;

/// Strategy mapping a task to its metric name.
///
/// Closures taking a `&Task` implement it too:
///
/// ```
/// use nodetime::hooks::MetricNamer;
/// use nodetime::pipeline::Task;
///
/// let by_name = |task: &Task| task.name.clone();
/// assert_eq!(by_name.metric_name(&Task::new("fit", "pkg.fit")), "fit");
/// ```
pub trait MetricNamer {
    fn metric_name(&self, task: &Task) -> String;
}

impl<F> MetricNamer for F
where
    F: Fn(&Task) -> String,
{
    fn metric_name(&self, task: &Task) -> String {
        self(task)
    }
}

/// Default naming: `_time_to_run <func> -- <out1> - <out2>`.
///
/// `<func>` is the task's function name with `<` and `>` removed, cut at
/// the first space, reduced to its last dotted segment and truncated to
/// [`MAX_FUNC_NAME_LEN`] characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetricNamer;

impl MetricNamer for DefaultMetricNamer {
    fn metric_name(&self, task: &Task) -> String {
        format!(
            "_time_to_run {} -- {}",
            short_func_name(&task.func),
            task.outputs.join(" - ")
        )
    }
}

/// Reduces a qualified function name to its bare, bounded form.
pub fn short_func_name(func: &str) -> String {
    let stripped: String = func.chars().filter(|c| *c != '<' && *c != '>').collect();
    let head = stripped.split(' ').next().unwrap_or_default();
    let last = head.rsplit('.').next().unwrap_or_default();
    last.chars().take(MAX_FUNC_NAME_LEN).collect()
}
