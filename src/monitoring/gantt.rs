//! Gantt Chart Rows and Renderers
//!
//! Rows are built from recorded task start/finish times and handed,
//! together with free-form options, to a [`ChartRenderer`] that turns
//! them into a document ready to be written to disk.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::hooks::HookError;

/// Free-form renderer options, passed through verbatim.
pub type GanttOptions = Map<String, Value>;

/// plotly.js bundle referenced by generated HTML pages.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// One bar of a Gantt chart, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttRow {
    pub task: String,
    pub start_ms: f64,
    pub finish_ms: f64,
}

impl GanttRow {
    /// Builds a row from start/finish times in seconds.
    pub fn from_seconds(task: impl Into<String>, start: f64, finish: f64) -> Self {
        Self {
            task: task.into(),
            start_ms: start * 1000.0,
            finish_ms: finish * 1000.0,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.finish_ms - self.start_ms
    }
}

/// Turns Gantt rows into a writable document.
pub trait ChartRenderer {
    /// False for renderers standing in for a disabled chart.
    fn is_active(&self) -> bool {
        true
    }

    fn render(&self, rows: &[GanttRow], options: &GanttOptions) -> Result<String, HookError>;
}

/// Renderer used when charts are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl ChartRenderer for NoopRenderer {
    fn is_active(&self) -> bool {
        false
    }

    fn render(&self, _rows: &[GanttRow], _options: &GanttOptions) -> Result<String, HookError> {
        Ok(String::new())
    }
}

/// Renders a standalone HTML page with a plotly timeline.
///
/// Recognized options:
/// - `title` (default `"Gantt Chart"`)
/// - `height` (default 600) and `width`
/// - `bar_width`: half the bar thickness in row units (default 0.2)
/// - `colors`: a color or list of colors for the bars
/// - `showgrid_x` / `showgrid_y` (default false)
///
/// Any other key is merged into the plotly layout as given.
#[derive(Debug, Clone)]
pub struct HtmlGanttRenderer {
    plotly_src: String,
}

impl HtmlGanttRenderer {
    pub fn new() -> Self {
        Self {
            plotly_src: PLOTLY_CDN.to_string(),
        }
    }

    /// Loads plotly.js from another location.
    pub fn with_plotly_src(mut self, src: impl Into<String>) -> Self {
        self.plotly_src = src.into();
        self
    }

    /// Builds the plotly figure (`data` and `layout`) for the rows.
    pub fn figure(&self, rows: &[GanttRow], options: &GanttOptions) -> Value {
        let mut options = options.clone();

        let title = options
            .remove("title")
            .unwrap_or_else(|| json!("Gantt Chart"));
        let height = options.remove("height").unwrap_or_else(|| json!(600));
        let width = options.remove("width");
        let bar_width = options
            .remove("bar_width")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.2);
        let colors = options.remove("colors");
        let showgrid_x = options.remove("showgrid_x").unwrap_or(json!(false));
        let showgrid_y = options.remove("showgrid_y").unwrap_or(json!(false));

        let mut marker = Map::new();
        if let Some(colors) = colors {
            marker.insert("color".to_string(), colors);
        }

        let trace = json!({
            "type": "bar",
            "orientation": "h",
            "y": rows.iter().map(|r| r.task.as_str()).collect::<Vec<_>>(),
            "base": rows.iter().map(|r| r.start_ms).collect::<Vec<_>>(),
            "x": rows.iter().map(GanttRow::duration_ms).collect::<Vec<_>>(),
            "width": bar_width * 2.0,
            "marker": marker,
            "hovertemplate": "%{y}<br>%{base|%H:%M:%S.%L} - %{x:.0f} ms<extra></extra>",
        });

        let mut layout = json!({
            "title": { "text": title },
            "height": height,
            "showlegend": false,
            "hovermode": "closest",
            "xaxis": { "type": "date", "showgrid": showgrid_x },
            "yaxis": { "autorange": "reversed", "showgrid": showgrid_y },
        });

        if let Value::Object(layout) = &mut layout {
            if let Some(width) = width {
                layout.insert("width".to_string(), width);
            }
            merge_objects(layout, options);
        }

        json!({ "data": [trace], "layout": layout })
    }
}

impl Default for HtmlGanttRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer for HtmlGanttRenderer {
    fn render(&self, rows: &[GanttRow], options: &GanttOptions) -> Result<String, HookError> {
        let figure = self.figure(rows, options);
        let title = figure["layout"]["title"]["text"]
            .as_str()
            .unwrap_or("Gantt Chart")
            .to_string();

        // "</" inside the inline script would end the script element.
        let figure_json = serde_json::to_string(&figure)?.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="{src}"></script>
</head>
<body>
<div id="gantt" style="width:100%;"></div>
<script>
var figure = {figure};
Plotly.newPlot("gantt", figure.data, figure.layout, {{"responsive": true}});
</script>
</body>
</html>
"#,
            title = escape_html(&title),
            src = escape_html(&self.plotly_src),
            figure = figure_json,
        ))
    }
}

/// Merges `source` into `target`, descending into objects present in both
/// so `xaxis`/`yaxis` overrides keep the timeline axis settings.
fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
