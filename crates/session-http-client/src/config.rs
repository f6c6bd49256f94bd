//! Construction-time client configuration.

use crate::refresh::RefreshMode;
use client_config_and_utils::{Config, CoreResult, RuntimeKind};
use device_identity::DeviceIdentity;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Session probe ("who am I").
pub const ME_PATH: &str = "/api/v1/users/me";
/// Cookie-based session renewal.
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";
/// URL fragments marking endpoints that need a live session.
pub const AUTH_REQUIRED_PATTERNS: &[&str] = &["/api/v1/auth/"];
/// Static document shown while the API is in maintenance.
pub const MAINTENANCE_PATH: &str = "/maintenance.html";
pub const HOME_ROUTE: &str = "/";

/// Shared secret sent by server-side callers so the origin can recognise
/// trusted edge traffic. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct EdgeSecret(String);

impl EdgeSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `abcd...wxyz` for long secrets, `[set]` otherwise.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "[set]".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for EdgeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeSecret({})", self.masked())
    }
}

/// Where the client runs, and the runtime-specific credentials it carries.
#[derive(Debug, Clone)]
pub enum ClientRuntime {
    Browser { identity: DeviceIdentity },
    Server { auth_secret: Option<EdgeSecret> },
}

impl ClientRuntime {
    pub fn is_browser(&self) -> bool {
        matches!(self, ClientRuntime::Browser { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub runtime: ClientRuntime,
    pub auth_required_patterns: Vec<String>,
    pub maintenance_path: String,
    pub refresh_mode: RefreshMode,
}

impl ClientConfig {
    pub fn new(base_url: Url, runtime: ClientRuntime) -> Self {
        Self {
            base_url,
            timeout: Duration::from_millis(client_config_and_utils::DEFAULT_REQUEST_TIMEOUT_MS),
            runtime,
            auth_required_patterns: AUTH_REQUIRED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            maintenance_path: MAINTENANCE_PATH.to_string(),
            refresh_mode: RefreshMode::default(),
        }
    }

    /// Resolve the environment split once, at the composition root.
    ///
    /// `identity` is only used for the browser runtime.
    pub fn from_config(config: &Config, identity: DeviceIdentity) -> CoreResult<Self> {
        let runtime = match config.runtime {
            RuntimeKind::Browser => ClientRuntime::Browser { identity },
            RuntimeKind::Server => ClientRuntime::Server {
                auth_secret: config.auth_secret.clone().map(EdgeSecret::new),
            },
        };
        Ok(Self {
            timeout: config.request_timeout(),
            ..Self::new(config.api_base_url()?, runtime)
        })
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a relative path or pass through an absolute URL.
    pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Url::parse(target);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = target.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
    }
}
