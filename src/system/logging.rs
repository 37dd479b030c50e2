//! Logging system initialization
//!
//! Sets up the tracing subscriber from the loaded configuration, with
//! optional file output and JSON formatting.

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;

/// Initialize the logging system based on configuration.
///
/// Call once during startup, after configuration has been loaded.
///
/// # Returns
/// * `WorkerGuard` - must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
///
/// # Panics
/// * If opening the log file fails
/// * If a global subscriber is already installed
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let writer: Box<dyn std::io::Write + Send + Sync> = match config.log_file {
        Some(ref log_file) if !log_file.is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .expect("Failed to open log file");
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::new(config.log_level.clone());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(config.log_file.as_ref().is_none_or(|f| f.is_empty()));

    if config.log_format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}
