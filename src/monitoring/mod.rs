//! Timeline Visualization Module
//!
//! Provides Gantt chart rows and the renderers that turn recorded task
//! timings into chart documents.
//!
//! # Components
//!
//! - [`GanttRow`]: Task start/finish pair in milliseconds
//! - [`HtmlGanttRenderer`]: Standalone plotly HTML page
//! - [`TextGanttRenderer`]: ASCII bars for terminals

pub mod gantt;
pub mod timeline;

pub use gantt::{ChartRenderer, GanttOptions, GanttRow, HtmlGanttRenderer, NoopRenderer};
pub use timeline::TextGanttRenderer;
