//! Logging system initialization
//!
//! This module provides functions to initialize the tracing/logging system
//! based on application configuration.

use std::io::Write;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "rentroute.log";

/// Initialize logging system based on configuration
///
/// This sets up the logging system according to the loaded configuration,
/// including file output, log rotation, and formatting.
///
/// **Note**: This should be called only once during application startup,
/// after the configuration has been loaded. A second call keeps the first
/// subscriber.
///
/// # Returns
/// * `WorkerGuard` - Must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let (writer, to_console) = build_writer(config);

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level).unwrap_or_else(|e| {
        eprintln!(
            "[WARN] Invalid log level '{}': {}, falling back to info",
            config.level, e
        );
        tracing_subscriber::EnvFilter::new("info")
    });

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(to_console);

    let result = if config.format == "json" {
        subscriber_builder.json().try_init()
    } else {
        subscriber_builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("[WARN] Logging already initialized: {}", e);
    }

    guard
}

/// 日志输出目标；打开文件失败时退回到 stdout
fn build_writer(config: &LoggingConfig) -> (Box<dyn Write + Send + Sync>, bool) {
    let Some(log_file) = config.file.as_deref().filter(|f| !f.is_empty()) else {
        return (Box::new(std::io::stdout()), true);
    };

    if config.enable_rotation {
        let path = Path::new(log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);

        match rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(filename.trim_end_matches(".log"))
            .filename_suffix("log")
            .max_log_files(config.max_backups.max(1) as usize)
            .build(dir)
        {
            Ok(appender) => (Box::new(appender), false),
            Err(e) => {
                eprintln!(
                    "[ERROR] Failed to create rolling log appender in {}: {}, logging to stdout",
                    dir.display(),
                    e
                );
                (Box::new(std::io::stdout()), true)
            }
        }
    } else {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
        {
            Ok(file) => (Box::new(file), false),
            Err(e) => {
                eprintln!(
                    "[ERROR] Failed to open log file {}: {}, logging to stdout",
                    log_file, e
                );
                (Box::new(std::io::stdout()), true)
            }
        }
    }
}
