//! Failure classification and the session refresh controller.

use crate::client::Dispatcher;
use crate::{ApiError, Navigator, RequestContext, UnauthorizedSignal, ME_PATH, REFRESH_PATH};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do with a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Service unavailable: show the maintenance page, then propagate.
    Maintenance,
    /// Hand the error to the caller unchanged.
    Propagate,
    /// The session cannot be recovered: fire the signal, then propagate.
    Unauthorized,
    /// Refresh the session once and re-dispatch the retried context.
    RefreshAndRetry,
}

/// How concurrent refreshes interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Every failing request runs its own refresh call.
    #[default]
    PerRequest,
    /// Concurrent failures share one in-flight refresh call.
    Coalesced,
}

/// Ordered failure policy.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    auth_required_patterns: Vec<String>,
    refresh_enabled: bool,
}

impl RefreshPolicy {
    /// `refresh_enabled` is false for server-side clients, which never hold a
    /// refreshable browser session.
    pub fn new(auth_required_patterns: Vec<String>, refresh_enabled: bool) -> Self {
        Self {
            auth_required_patterns,
            refresh_enabled,
        }
    }

    fn requires_auth(&self, url: &str) -> bool {
        self.auth_required_patterns
            .iter()
            .any(|pattern| url.contains(pattern.as_str()))
    }

    /// Classify a failure of `ctx` dispatched to `url`.
    pub fn classify(&self, ctx: &RequestContext, url: &str, error: &ApiError) -> FailureAction {
        if error.is_service_unavailable() {
            return FailureAction::Maintenance;
        }
        if !error.is_unauthorized() || ctx.is_retried() || !self.refresh_enabled {
            return FailureAction::Propagate;
        }
        // The probe's 401 means "logged out", not "expired".
        if url.contains(ME_PATH) {
            return FailureAction::Propagate;
        }
        if url.contains(REFRESH_PATH) {
            return FailureAction::Unauthorized;
        }
        if !self.requires_auth(url) {
            return FailureAction::Propagate;
        }
        FailureAction::RefreshAndRetry
    }
}

type SharedRefresh = Shared<BoxFuture<'static, bool>>;
type RefreshSlot = Arc<Mutex<Option<(u64, SharedRefresh)>>>;

/// Issues refresh calls and fires the unauthorized signal when one fails.
pub(crate) struct RefreshController {
    mode: RefreshMode,
    signal: UnauthorizedSignal,
    navigator: Arc<dyn Navigator>,
    in_flight: RefreshSlot,
    generation: AtomicU64,
}

impl RefreshController {
    pub(crate) fn new(
        mode: RefreshMode,
        signal: UnauthorizedSignal,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            mode,
            signal,
            navigator,
            in_flight: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns whether the session was renewed.
    pub(crate) async fn refresh(&self, dispatcher: &Arc<Dispatcher>) -> bool {
        match self.mode {
            RefreshMode::PerRequest => {
                run_refresh(
                    dispatcher.clone(),
                    self.signal.clone(),
                    self.navigator.clone(),
                )
                .await
            }
            RefreshMode::Coalesced => self.refresh_coalesced(dispatcher).await,
        }
    }

    async fn refresh_coalesced(&self, dispatcher: &Arc<Dispatcher>) -> bool {
        let refresh = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some((_, refresh)) => {
                    debug!("Joining in-flight session refresh");
                    refresh.clone()
                }
                None => {
                    let id = self.generation.fetch_add(1, Ordering::Relaxed);
                    let run = run_refresh(
                        dispatcher.clone(),
                        self.signal.clone(),
                        self.navigator.clone(),
                    );
                    let owner = self.in_flight.clone();
                    // Vacated by the future itself, even if every waiter is gone.
                    let refresh = async move {
                        let renewed = run.await;
                        let mut slot = owner.lock();
                        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
                            *slot = None;
                        }
                        renewed
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, refresh.clone()));
                    refresh
                }
            }
        };

        refresh.await
    }
}

async fn run_refresh(
    dispatcher: Arc<Dispatcher>,
    signal: UnauthorizedSignal,
    navigator: Arc<dyn Navigator>,
) -> bool {
    match dispatcher.dispatch(&RequestContext::post(REFRESH_PATH)).await {
        Ok(_) => {
            info!("Session refreshed");
            true
        }
        Err(e) => {
            warn!(error = %e, "Session refresh failed");
            let config = dispatcher.config();
            if e.is_service_unavailable() && config.runtime.is_browser() {
                navigator.navigate(&config.maintenance_path);
            }
            signal.fire();
            false
        }
    }
}
