//! Tracing setup: an append-only log file plus warnings on stderr.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{Level, Metadata};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::worker;

/// Pipeline events already reach the user through progress reporting.
const WORKER_TARGET: &str = "worklog_digest::worker";

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
///
/// The file receives every event passing the filter. With `console` set,
/// warnings and errors also go to stderr, except those from the pipeline
/// worker. Callers that own stderr for machine-readable output pass `false`.
pub fn init(config: &LoggingConfig, console: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if let Some(parent) = config.file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("Failed to open log file: {}", config.file.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    let stderr_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .compact()
            .with_filter(filter_fn(|meta: &Metadata<'_>| {
                shown_on_console(meta.level(), meta.target())
            }))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logging initialized");
    Ok(())
}

/// Sends panics raised on the pipeline thread to the log instead of stderr.
///
/// The run already reports them, as a skipped file when a PDF parser panic
/// is caught or as a failed run otherwise. Other threads keep the default
/// hook.
pub fn capture_worker_panics() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if std::thread::current().name() == Some(worker::THREAD_NAME) {
            tracing::warn!(target: WORKER_TARGET, panic = %info, "panic on pipeline thread");
        } else {
            default_hook(info);
        }
    }));
}

fn shown_on_console(level: &Level, target: &str) -> bool {
    *level <= Level::WARN && !target.starts_with(WORKER_TARGET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_shows_warnings_but_not_worker_events() {
        assert!(shown_on_console(&Level::WARN, "worklog_digest::selector"));
        assert!(shown_on_console(&Level::ERROR, "worklog_digest::ollama"));
        assert!(!shown_on_console(&Level::INFO, "worklog_digest::selector"));
        assert!(!shown_on_console(&Level::ERROR, "worklog_digest::worker"));
        assert!(!shown_on_console(&Level::WARN, "worklog_digest::worker"));
    }
}
