//! NodeTime CLI Entry Point
//!
//! Runs a pipeline with the timing hooks attached.
//!
//! # Usage
//!
//! ```bash
//! # Run a pipeline, writing the Gantt chart to the temp directory
//! nodetime pipeline.yaml
//!
//! # Track durations and datasets in a local run store
//! nodetime pipeline.yaml --tracking-dir runs
//!
//! # Use a hooks file and a text timeline
//! nodetime pipeline.yaml --hooks hooks.yaml --chart-format text
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use nodetime::hooks::{load_hooks_config, CatalogLoggerHook, Hook, HooksConfig, TimeLoggerHook};
use nodetime::monitoring::TextGanttRenderer;
use nodetime::pipeline::{load_pipeline, Runner};
use nodetime::tracking::FileTrackingSink;
use nodetime::{APP_NAME, VERSION};

/// Default pipeline file used when none is specified.
const DEFAULT_PIPELINE: &str = "pipeline.yaml";

/// Output format of the Gantt chart.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ChartFormat {
    Html,
    Text,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    pipeline_path: String,
    hooks_path: Option<PathBuf>,
    gantt_path: Option<PathBuf>,
    no_gantt: bool,
    chart_format: ChartFormat,
    tracking_dir: Option<PathBuf>,
    no_tracking: bool,
    working_dir: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_path: DEFAULT_PIPELINE.to_string(),
            hooks_path: None,
            gantt_path: None,
            no_gantt: false,
            chart_format: ChartFormat::Html,
            tracking_dir: None,
            no_tracking: false,
            working_dir: None,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Task timing for data pipelines");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: nodetime [OPTIONS] <PIPELINE_FILE>");
    println!();
    println!("Arguments:");
    println!("  <PIPELINE_FILE>       Path to pipeline YAML file (default: {})", DEFAULT_PIPELINE);
    println!();
    println!("Options:");
    println!("  --hooks FILE          Hooks configuration YAML");
    println!("  --gantt PATH          Where to write the Gantt chart");
    println!("  --no-gantt            Do not render a Gantt chart");
    println!("  --chart-format FMT    Chart format: html (default) or text");
    println!("  --tracking-dir DIR    Record metrics and artifacts under DIR");
    println!("  --no-tracking         Disable tracking even if configured");
    println!("  --working-dir PATH    Working directory for task commands");
    println!("  --dry-run             Preview commands without execution");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  nodetime pipeline.yaml");
    println!("  nodetime pipeline.yaml --tracking-dir runs --gantt reports/gantt.html");
}

/// Returns the value following a flag.
fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", flag))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => config.dry_run = true,
            "--verbose" | "-v" => config.verbose = true,
            "--no-gantt" => config.no_gantt = true,
            "--no-tracking" => config.no_tracking = true,
            "--hooks" => {
                config.hooks_path = Some(PathBuf::from(flag_value(args, &mut i, arg)?));
            }
            "--gantt" => {
                config.gantt_path = Some(PathBuf::from(flag_value(args, &mut i, arg)?));
            }
            "--tracking-dir" => {
                config.tracking_dir = Some(PathBuf::from(flag_value(args, &mut i, arg)?));
            }
            "--working-dir" => {
                config.working_dir = Some(PathBuf::from(flag_value(args, &mut i, arg)?));
            }
            "--chart-format" => {
                config.chart_format = match flag_value(args, &mut i, arg)? {
                    "html" => ChartFormat::Html,
                    "text" | "txt" => ChartFormat::Text,
                    other => return Err(format!("Unknown chart format: {}", other)),
                };
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.pipeline_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Merges command-line overrides into the hooks configuration.
fn apply_overrides(hooks: &mut HooksConfig, config: &Config) {
    if let Some(ref dir) = config.tracking_dir {
        hooks.tracking_dir = Some(dir.clone());
    }
    if config.no_tracking {
        hooks.tracking_dir = None;
    }
    if let Some(ref path) = config.gantt_path {
        hooks.time_logger.gantt_filepath = Some(path.clone());
    }
    if config.no_gantt {
        hooks.time_logger.enable_gantt = false;
    }
    if config.chart_format == ChartFormat::Text && hooks.time_logger.gantt_filepath.is_none() {
        hooks.time_logger.gantt_filepath = Some(env::temp_dir().join("_gantt.txt"));
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    if config.dry_run {
        info!("Mode: DRY RUN (commands will not execute)");
    }

    let mut hooks = match config.hooks_path {
        Some(ref path) => load_hooks_config(path)?,
        None => HooksConfig::default(),
    };
    apply_overrides(&mut hooks, &config);

    let pipeline = load_pipeline(&config.pipeline_path).map_err(|e| {
        error!("Failed to load pipeline: {}", e);
        format!(
            "Could not load pipeline from '{}': {}",
            config.pipeline_path, e
        )
    })?;

    let tracker = match hooks.tracking_dir {
        Some(ref dir) => Some(FileTrackingSink::create(dir)?),
        None => None,
    };

    let mut timer = TimeLoggerHook::new(hooks.time_logger.clone());
    if config.chart_format == ChartFormat::Text {
        timer = timer.with_renderer(TextGanttRenderer);
    }
    if let Some(ref sink) = tracker {
        timer = timer.with_tracker(sink.clone());
    }

    let mut catalog = hooks.catalog_logger.clone().map(|catalog_config| {
        let hook = CatalogLoggerHook::new(catalog_config);
        match tracker {
            Some(ref sink) => hook.with_tracker(sink.clone()),
            None => hook,
        }
    });

    let mut runner = Runner::new();
    runner.set_dry_run(config.dry_run);
    if let Some(ref dir) = config.working_dir {
        runner.set_working_dir(dir);
    }

    let summary = {
        let mut active: Vec<&mut dyn Hook> = vec![&mut timer];
        if let Some(ref mut catalog) = catalog {
            active.push(catalog);
        }
        runner.run(&pipeline, &mut active)?
    };

    println!();
    println!("{}", "Pipeline completed successfully".green().bold());
    println!("Total execution time: {:.2?}", summary.elapsed);
    println!();
    for (name, seconds) in timer.durations() {
        println!("  {:>9.3}s  {}", seconds, name);
    }
    if timer.is_charting() {
        println!();
        println!("Gantt chart: {}", timer.gantt_path().display());
    }
    if let Some(ref sink) = tracker {
        println!("Tracking run: {}", sink.run_dir().display());
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("nodetime")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert_eq!(config.pipeline_path, DEFAULT_PIPELINE);
        assert_eq!(config.chart_format, ChartFormat::Html);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse_flags() {
        let config = parse_arguments(&args(&[
            "flow.yaml",
            "--tracking-dir",
            "runs",
            "--gantt",
            "out/g.html",
            "--chart-format",
            "text",
            "--dry-run",
        ]))
        .unwrap();

        assert_eq!(config.pipeline_path, "flow.yaml");
        assert_eq!(config.tracking_dir, Some(PathBuf::from("runs")));
        assert_eq!(config.gantt_path, Some(PathBuf::from("out/g.html")));
        assert_eq!(config.chart_format, ChartFormat::Text);
        assert!(config.dry_run);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--gantt"])).is_err());
        assert!(parse_arguments(&args(&["--chart-format", "svg"])).is_err());
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut hooks = HooksConfig {
            tracking_dir: Some(PathBuf::from("configured")),
            ..HooksConfig::default()
        };
        let config = Config {
            no_tracking: true,
            no_gantt: true,
            chart_format: ChartFormat::Text,
            ..Config::default()
        };

        apply_overrides(&mut hooks, &config);

        assert!(hooks.tracking_dir.is_none());
        assert!(!hooks.time_logger.enable_gantt);
        assert_eq!(
            hooks.time_logger.gantt_filepath,
            Some(env::temp_dir().join("_gantt.txt"))
        );
    }
}
