//! Core types, configuration, and utilities for the TechInsights client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, Deployment, RuntimeKind, DEFAULT_DEV_API_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_PROBE_RETRY_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_MS, PRODUCTION_API_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
