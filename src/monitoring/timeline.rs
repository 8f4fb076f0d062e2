//! Text Timeline
//!
//! Renders Gantt rows as ASCII bars, for terminals and plain-text
//! reports.

use crate::hooks::HookError;

use super::gantt::{ChartRenderer, GanttOptions, GanttRow};

/// Default bar area width in characters.
const DEFAULT_WIDTH: usize = 50;

/// Default task label width in characters.
const DEFAULT_LABEL_WIDTH: usize = 40;

/// Upper bound for both `width` and `label_width`.
const MAX_WIDTH: usize = 500;

/// ASCII Gantt chart renderer.
///
/// Each task is shown as a bar indicating when it ran relative to the
/// whole run. Honors the `title`, `width` and `label_width` options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextGanttRenderer;

impl ChartRenderer for TextGanttRenderer {
    fn render(&self, rows: &[GanttRow], options: &GanttOptions) -> Result<String, HookError> {
        let title = options
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Execution Timeline");
        let width = usize_option(options, "width").unwrap_or(DEFAULT_WIDTH);
        let label_width = usize_option(options, "label_width")
            .unwrap_or(DEFAULT_LABEL_WIDTH)
            .clamp(4, MAX_WIDTH);

        let mut output = format!("\n{}:\n\n", title);

        if rows.is_empty() {
            return Ok(output);
        }

        let origin = rows.iter().map(|r| r.start_ms).fold(f64::INFINITY, f64::min);
        let end = rows
            .iter()
            .map(|r| r.finish_ms)
            .fold(f64::NEG_INFINITY, f64::max);
        let total = end - origin;

        let scale = |ms: f64| {
            if total > 0.0 {
                ms * width as f64 / total
            } else {
                0.0
            }
        };

        for row in rows {
            let start_pos = scale(row.start_ms - origin) as usize;
            let length = scale(row.duration_ms()).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&"#".repeat(length));

            output.push_str(&format!(
                "{} |{}| ({:.0} ms)\n",
                truncate(&row.task, label_width),
                bar,
                row.duration_ms()
            ));
        }

        output.push_str(&format!("\nTotal: {:.0} ms\n", total));
        Ok(output)
    }
}

fn usize_option(options: &GanttOptions, key: &str) -> Option<usize> {
    options
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v.min(MAX_WIDTH as u64) as usize)
}

/// Pads or truncates a label to exactly `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
