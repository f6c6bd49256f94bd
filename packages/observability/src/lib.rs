//! # Observability
//!
//! Centralized tracing setup for the TechInsights client.
//!
//! Library crates are **log producers** only. They use plain `tracing` macros
//! with structured fields and never decide where output goes. The binary calls
//! [`init_with_config`] once at startup, which installs:
//!
//! - a JSONL file layer at `~/.techinsights/logs/client.jsonl` (one object per
//!   line: timestamp, level, service, pid, target, message, fields);
//! - an optional compact stderr layer for interactive use.
//!
//! Both layers honour `RUST_LOG` and fall back to the configured level.
//! Fields whose names look like credentials (cookies, the edge secret header,
//! tokens) are replaced with `[redacted]` before they reach the file.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "techinsights".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::{default_log_path, CentralLogWriter};
pub use json_layer::{is_sensitive_field, LogEntry, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSON line.
    pub service_name: String,

    /// Default filter (e.g. "info", "session_http_client=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    /// Custom log file path. Defaults to [`default_log_path`].
    pub log_path: Option<PathBuf>,

    /// Write the JSONL file at all.
    pub log_to_file: bool,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            log_to_file: true,
            also_stderr: false,
        }
    }
}

/// Initialize with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Safe to call more than once: only the first call installs a subscriber.
/// If the log file cannot be opened the file layer is skipped and a warning
/// is printed to stderr; logging never aborts the process.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let log_path = config.log_path.clone().or_else(default_log_path);

    let file_layer = if config.log_to_file {
        match log_path.as_ref().map(CentralLogWriter::new) {
            Some(Ok(writer)) => Some(
                json_layer::JsonLayer::new(config.service_name.clone(), writer)
                    .with_filter(env_filter(&config.default_level)),
            ),
            Some(Err(e)) => {
                eprintln!("observability: file logging disabled: {}", e);
                None
            }
            None => None,
        }
    } else {
        None
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path.filter(|_| config.log_to_file),
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
