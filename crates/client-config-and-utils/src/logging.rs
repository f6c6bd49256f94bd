//! Logging initialization for the client.
//!
//! Thin wrapper over the observability crate so the binary only needs the
//! resolved [`Config`](crate::Config) and [`Paths`](crate::Paths).

use crate::Paths;

/// Initialize the logging system.
///
/// - Structured JSONL output to `{base}/logs/client.jsonl` when `to_file` is set
/// - Compact stderr output
/// - Log level from RUST_LOG env var or the provided default
///
/// ```ignore
/// init_logging("info", &paths, true);
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, paths: &Paths, to_file: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: "techinsights".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        log_to_file: to_file,
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
