/// Logging setup with background file rotation and multi-layer tracing.
///
/// This module provides:
/// - JSON and text log files, rotated daily
/// - Non-blocking file writers
/// - `RUST_LOG` based level filtering
/// - A stderr-only setup for short CLI invocations
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub type LoggingError = Box<dyn std::error::Error + Send + Sync>;

/// Keeps the background log writers alive. Buffered lines are flushed when
/// this is dropped, so hold it until the program exits.
#[must_use = "dropping the guards stops file logging"]
pub struct LogGuards {
    _text: WorkerGuard,
    _json: WorkerGuard,
}

/// Build the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default)?),
    }
}

/// Initialize the tracing subscriber with file and terminal output.
///
/// Creates two log outputs inside `log_dir`:
/// 1. `frontier.log` - human-readable text, ANSI colors disabled
/// 2. `frontier.json.log` - structured JSON for analysis
///
/// Terminal output goes to stderr so command output on stdout stays clean.
///
/// # Environment Variables
/// * `RUST_LOG` - level filter (default: "info"), e.g.
///   `RUST_LOG=crawl_frontier=debug,redb=warn`
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<LogGuards, LoggingError> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let filter = env_filter("info")?;

    let text_file_appender = tracing_appender::rolling::daily(log_path, "frontier.log");
    let (text_writer, text_guard) = tracing_appender::non_blocking(text_file_appender);

    let json_file_appender = tracing_appender::rolling::daily(log_path, "frontier.json.log");
    let (json_writer, json_guard) = tracing_appender::non_blocking(json_file_appender);

    let text_layer = fmt::layer()
        .with_writer(text_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter.clone());

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(filter.clone());

    let terminal_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(terminal_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs will be written to {}", log_path.display());

    Ok(LogGuards {
        _text: text_guard,
        _json: json_guard,
    })
}

/// Terminal-only logging, quiet by default (`warn`).
pub fn init_stderr_logging() -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(env_filter("warn")?),
        )
        .try_init()?;
    Ok(())
}
