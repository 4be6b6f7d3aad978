//! Telemetry setup

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppError;

/// Installs the global subscriber.
///
/// `RUST_LOG` picks the filter (default `info,sbweb=debug`), `LOG_FORMAT=json`
/// switches stdout to JSON lines, and `LOG_DIR` adds a daily rolling log file.
pub fn init_telemetry() -> Result<(), AppError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sbweb=debug".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter =
        EnvFilter::try_new(&log_level).map_err(|e| AppError::TelemetryError(e.to_string()))?;

    let file_appender = match std::env::var("LOG_DIR") {
        Ok(dir) => Some(
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("sbweb")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| AppError::TelemetryError(e.to_string()))?,
        ),
        Err(_) => None,
    };

    let result = match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(file_appender.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
            }))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stdout)
                    .with_target(true),
            )
            .with(file_appender.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false) // No colors in file
            }))
            .try_init(),
    };

    result.map_err(|e| AppError::TelemetryError(e.to_string()))
}
