//! Configuration management for the client.
//!
//! Values come from `~/.techinsights/config.json` (when present) and are then
//! overridden by `TECHINSIGHTS_*` environment variables. The server-only edge
//! secret is accepted from the environment only and never written to disk.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// API origin used when the deployment environment is `production`.
pub const PRODUCTION_API_URL: &str = "https://api.techinsights.shop";

/// API origin used in every other environment unless overridden.
pub const DEFAULT_DEV_API_URL: &str = "http://localhost:8080";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Per-request ceiling.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Delay before the single mount-probe retry.
pub const DEFAULT_PROBE_RETRY_DELAY_MS: u64 = 800;

/// Deployment environment, selecting the API origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    Production,
    #[default]
    Development,
}

impl Deployment {
    /// Only the exact value `production` selects the production origin.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim() == "production" {
            Deployment::Production
        } else {
            Deployment::Development
        }
    }
}

/// Which side of the edge this client runs on.
///
/// The browser runtime carries a persistent device id and may refresh
/// sessions; the server runtime carries the edge secret instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Browser,
    Server,
}

impl FromStr for RuntimeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(RuntimeKind::Browser),
            "server" => Ok(RuntimeKind::Server),
            other => Err(CoreError::Config(format!(
                "unknown runtime '{}', expected 'browser' or 'server'",
                other
            ))),
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Browser => write!(f, "browser"),
            RuntimeKind::Server => write!(f, "server"),
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write the JSONL log file in addition to stderr.
    #[serde(default = "default_true")]
    pub log_to_file: bool,
    #[serde(default)]
    pub deployment: Deployment,
    /// API origin for non-production deployments.
    #[serde(default = "default_dev_api_url")]
    pub dev_api_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub runtime: RuntimeKind,
    #[serde(default = "default_probe_retry_delay_ms")]
    pub probe_retry_delay_ms: u64,
    /// Shared secret identifying trusted edge traffic (server runtime only).
    #[serde(skip)]
    pub auth_secret: Option<String>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_dev_api_url() -> String {
    DEFAULT_DEV_API_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_probe_retry_delay_ms() -> u64 {
    DEFAULT_PROBE_RETRY_DELAY_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_to_file: true,
            deployment: Deployment::default(),
            dev_api_url: default_dev_api_url(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            runtime: RuntimeKind::default(),
            probe_retry_delay_ms: DEFAULT_PROBE_RETRY_DELAY_MS,
            auth_secret: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> CoreResult<Self> {
        let mut config = Self::default();
        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults, then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file. The edge secret is never persisted.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `TECHINSIGHTS_*` overrides from an arbitrary variable source.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = var("TECHINSIGHTS_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(value) = var("TECHINSIGHTS_LOG_TO_FILE") {
            self.log_to_file = !matches!(value.trim(), "0" | "false" | "no" | "off");
        }
        if let Some(env) = var("TECHINSIGHTS_DEPLOY_ENV") {
            self.deployment = Deployment::from_env_value(&env);
        }
        if let Some(url) = var("TECHINSIGHTS_API_URL") {
            self.dev_api_url = url;
        }
        if let Some(runtime) = var("TECHINSIGHTS_RUNTIME") {
            self.runtime = runtime.parse()?;
        }
        if let Some(secret) = var("TECHINSIGHTS_AUTH_SECRET") {
            self.auth_secret = Some(secret);
        }
        Ok(())
    }

    /// The API origin: production endpoint under the production deployment,
    /// the configured development endpoint otherwise.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let raw = match self.deployment {
            Deployment::Production => PRODUCTION_API_URL,
            Deployment::Development => self.dev_api_url.as_str(),
        };
        Url::parse(raw).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.deployment, Deployment::Development);
        assert_eq!(config.runtime, RuntimeKind::Browser);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe_retry_delay(), Duration::from_millis(800));
        assert!(config.auth_secret.is_none());
    }

    #[test]
    fn test_base_url_development_default() {
        let config = Config::default();
        let url = config.api_base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_base_url_production_ignores_dev_url() {
        let mut config = Config::default();
        config.dev_api_url = "http://staging.internal:9000".to_string();
        config.deployment = Deployment::Production;

        let url = config.api_base_url().unwrap();
        assert_eq!(url.host_str(), Some("api.techinsights.shop"));
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_invalid_dev_url() {
        let mut config = Config::default();
        config.dev_api_url = "not a valid url".to_string();
        assert!(matches!(
            config.api_base_url(),
            Err(CoreError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("TECHINSIGHTS_LOG_LEVEL", "debug"),
                ("TECHINSIGHTS_DEPLOY_ENV", "production"),
                ("TECHINSIGHTS_RUNTIME", "Server"),
                ("TECHINSIGHTS_AUTH_SECRET", "edge-secret-value"),
                ("TECHINSIGHTS_LOG_TO_FILE", "0"),
            ]))
            .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.deployment, Deployment::Production);
        assert_eq!(config.runtime, RuntimeKind::Server);
        assert_eq!(config.auth_secret.as_deref(), Some("edge-secret-value"));
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_non_production_deploy_env_is_development() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("TECHINSIGHTS_DEPLOY_ENV", "preview")]))
            .unwrap();
        assert_eq!(config.deployment, Deployment::Development);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("TECHINSIGHTS_LOG_LEVEL", ""),
                ("TECHINSIGHTS_AUTH_SECRET", "   "),
            ]))
            .unwrap();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.auth_secret.is_none());
    }

    #[test]
    fn test_unknown_runtime_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("TECHINSIGHTS_RUNTIME", "edge")]));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "runtime": "server", "deployment": "production" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.runtime, RuntimeKind::Server);
        assert_eq!(config.deployment, Deployment::Production);
        assert_eq!(config.dev_api_url, DEFAULT_DEV_API_URL);
    }

    #[test]
    fn test_save_never_writes_secret() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.log_level = "trace".to_string();
        config.auth_secret = Some("do-not-persist".to_string());
        config.save(&paths).unwrap();

        let raw = std::fs::read_to_string(paths.config_file()).unwrap();
        assert!(!raw.contains("do-not-persist"));

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.log_level, "trace");
        assert!(loaded.auth_secret.is_none());
    }

    #[test]
    fn test_runtime_display_roundtrip() {
        for kind in [RuntimeKind::Browser, RuntimeKind::Server] {
            assert_eq!(kind.to_string().parse::<RuntimeKind>().unwrap(), kind);
        }
    }
}
