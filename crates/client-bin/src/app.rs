//! Composition root.
//!
//! Resolves paths and configuration once, then wires the device identity,
//! transport, unauthorized signal, navigator, API client, auth state machine
//! and feed client together.

use anyhow::{Context, Result};
use auth_state::AuthStateMachine;
use client_config_and_utils::{Config, Paths};
use device_identity::{DeviceIdentity, FileDeviceStore};
use feed_api::FeedClient;
use parking_lot::Mutex;
use session_http_client::{
    ApiClient, ClientConfig, Navigator, ReqwestTransport, UnauthorizedSignal,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Records navigation requests so commands can report them.
///
/// A terminal cannot follow a redirect; the target is shown to the user.
#[derive(Default)]
pub struct CliNavigator {
    targets: Mutex<Vec<String>>,
}

impl CliNavigator {
    /// Drain the targets requested since the last call.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.targets.lock())
    }
}

impl Navigator for CliNavigator {
    fn navigate(&self, target: &str) {
        info!(target_url = %target, "Navigation requested");
        self.targets.lock().push(target.to_string());
    }
}

/// Options that influence how the client is assembled.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub base_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    /// Raw `name=value` cookie to seed the jar with.
    pub session_cookie: Option<String>,
    pub init_logging: bool,
}

pub struct App {
    pub paths: Paths,
    pub identity: DeviceIdentity,
    pub navigator: Arc<CliNavigator>,
    pub api: ApiClient,
    pub auth: AuthStateMachine,
    pub feed: FeedClient,
}

impl App {
    pub fn build(options: AppOptions) -> Result<Self> {
        let paths = match options.base_dir.clone() {
            Some(dir) => Paths::with_base_dir(dir),
            None => Paths::new().context("Failed to resolve home directory")?,
        };
        paths
            .ensure_dirs()
            .context("Failed to create client directories")?;

        let config = Config::load(&paths).context("Failed to load configuration")?;
        Self::from_config(paths, config, options)
    }

    pub fn from_config(paths: Paths, config: Config, options: AppOptions) -> Result<Self> {
        if options.init_logging {
            let level = options
                .log_level
                .as_deref()
                .map(|l| client_config_and_utils::parse_level(l).as_str().to_ascii_lowercase())
                .unwrap_or_else(|| config.log_level.clone());
            client_config_and_utils::init_logging(&level, &paths, config.log_to_file);
        }

        let identity =
            DeviceIdentity::browser(Arc::new(FileDeviceStore::new(paths.device_store_file())));
        let client_config = ClientConfig::from_config(&config, identity.clone())
            .context("Invalid API configuration")?;

        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        if let Some(cookie) = options.session_cookie.as_deref() {
            transport.add_cookie(cookie, &client_config.base_url);
            debug!("Seeded cookie jar from command line");
        }

        let navigator = Arc::new(CliNavigator::default());
        let api = ApiClient::builder(client_config)
            .transport(transport)
            .navigator(navigator.clone())
            .signal(UnauthorizedSignal::new())
            .build()?;

        let auth = AuthStateMachine::with_retry_delay(api.clone(), config.probe_retry_delay());
        let feed = FeedClient::new(api.clone());

        debug!(
            base_url = %api.config().base_url,
            runtime = %config.runtime,
            "Client assembled"
        );

        Ok(Self {
            paths,
            identity,
            navigator,
            api,
            auth,
            feed,
        })
    }
}
