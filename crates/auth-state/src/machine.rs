//! The auth state machine consumed by the UI.
//!
//! It owns [`SessionState`], publishes it over a `watch` channel, and holds
//! the unauthorized-signal slot while mounted. Every write is tagged with the
//! mount epoch it started under; writes from an older epoch are dropped, so
//! nothing that was in flight at unmount can change state afterwards.

use crate::auth_fsm::{SessionMachine, SessionMachineInput, SessionState};
use crate::{normalize_profile, AuthError, AuthResult, UserProfile};
use parking_lot::Mutex;
use serde_json::{json, Value};
use session_http_client::{
    ApiClient, ApiError, HandlerToken, HOME_ROUTE, LOGOUT_PATH, ME_PATH,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

/// Externally hosted OAuth entry point, relative to the API origin.
pub const LOGIN_PATH: &str = "/oauth2/authorization/google";
pub const NICKNAME_PATH: &str = "/api/v1/users/me/nickname";
pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Default delay before the single mount-probe retry.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

/// Host events that trigger revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    VisibilityChanged { visible: bool },
    WindowFocused,
}

impl ViewportEvent {
    fn triggers_revalidation(self) -> bool {
        match self {
            ViewportEvent::VisibilityChanged { visible } => visible,
            ViewportEvent::WindowFocused => true,
        }
    }
}

enum ProbeOutcome {
    Authenticated(UserProfile),
    /// 2xx without a usable profile.
    NoProfile,
    Failed(ApiError),
}

struct Inner {
    api: ApiClient,
    fsm: Mutex<SessionMachine>,
    state_tx: watch::Sender<SessionState>,
    epoch: AtomicU64,
    handler_token: Mutex<Option<HandlerToken>>,
    probe_task: Mutex<Option<AbortHandle>>,
    retry_delay: Duration,
}

#[derive(Clone)]
pub struct AuthStateMachine {
    inner: Arc<Inner>,
}

impl AuthStateMachine {
    pub fn new(api: ApiClient) -> Self {
        Self::with_retry_delay(api, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_delay(api: ApiClient, retry_delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Loading);
        Self {
            inner: Arc::new(Inner {
                api,
                fsm: Mutex::new(SessionMachine::new()),
                state_tx,
                epoch: AtomicU64::new(0),
                handler_token: Mutex::new(None),
                probe_task: Mutex::new(None),
                retry_delay,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state_tx.borrow().is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state_tx.borrow().user().cloned()
    }

    /// Take the unauthorized slot and start the mount probe.
    ///
    /// The probe calls the session endpoint; on failure it waits the retry
    /// delay and probes exactly once more before settling `Anonymous`.
    pub fn mount(&self) -> JoinHandle<()> {
        let epoch = self.advance_epoch();

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let token = self.inner.api.signal().set(move || {
            if let Some(inner) = weak.upgrade() {
                AuthStateMachine { inner }.handle_unauthorized();
            }
        });
        *self.inner.handler_token.lock() = Some(token);

        let machine = self.clone();
        let handle = tokio::spawn(async move { machine.run_mount_probe(epoch).await });
        if let Some(previous) = self.inner.probe_task.lock().replace(handle.abort_handle()) {
            previous.abort();
        }
        debug!(epoch, "Auth state machine mounted");
        handle
    }

    /// Release the unauthorized slot and cancel pending probe work.
    pub fn unmount(&self) {
        let epoch = self.advance_epoch();
        if let Some(token) = self.inner.handler_token.lock().take() {
            self.inner.api.signal().clear_if(token);
        }
        if let Some(task) = self.inner.probe_task.lock().take() {
            task.abort();
        }
        debug!(epoch, "Auth state machine unmounted");
    }

    /// Probe once (no retry) and settle.
    pub async fn revalidate(&self) -> SessionState {
        let epoch = self.current_epoch();
        match self.probe().await {
            ProbeOutcome::Authenticated(profile) => self.settle_authenticated(Some(epoch), profile),
            ProbeOutcome::NoProfile => {
                self.settle_anonymous(Some(epoch), SessionMachineInput::ProbeRejected)
            }
            ProbeOutcome::Failed(e) => {
                debug!(error = %e, "Revalidation probe failed");
                self.settle_anonymous(Some(epoch), SessionMachineInput::ProbeRejected)
            }
        }
        self.state()
    }

    pub async fn refetch_user(&self) -> SessionState {
        self.revalidate().await
    }

    /// Returns whether the event caused a revalidation.
    pub async fn handle_viewport_event(&self, event: ViewportEvent) -> bool {
        if !event.triggers_revalidation() {
            return false;
        }
        debug!(event = ?event, "Revalidating session");
        self.revalidate().await;
        true
    }

    /// Forward host events until the sender is dropped.
    pub fn listen(&self, mut events: mpsc::Receiver<ViewportEvent>) -> JoinHandle<()> {
        let machine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                machine.handle_viewport_event(event).await;
            }
        })
    }

    pub fn login_url(&self) -> AuthResult<Url> {
        Ok(self.inner.api.config().resolve(LOGIN_PATH)?)
    }

    /// Navigate to the external login page. Local state is untouched.
    pub fn login_redirect(&self) -> AuthResult<()> {
        let url = self.login_url()?;
        info!(url = %url, "Redirecting to login");
        self.inner.api.navigator().navigate(url.as_str());
        Ok(())
    }

    /// Fail-open logout: whatever the server says, settle `Anonymous` and go home.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.post(LOGOUT_PATH, None).await {
            warn!(error = %e, "Logout request failed, clearing session locally");
        }
        self.settle_anonymous(None, SessionMachineInput::LogoutCompleted);
        self.inner.api.navigator().navigate(HOME_ROUTE);
        info!("Logged out");
    }

    /// Change the nickname, then refetch the profile.
    pub async fn update_nickname(&self, nickname: &str) -> AuthResult<()> {
        let nickname = nickname.trim();
        let len = nickname.chars().count();
        if len < NICKNAME_MIN_CHARS {
            return Err(AuthError::InvalidNickname(format!(
                "must be at least {} characters",
                NICKNAME_MIN_CHARS
            )));
        }
        if len > NICKNAME_MAX_CHARS {
            return Err(AuthError::InvalidNickname(format!(
                "must be at most {} characters",
                NICKNAME_MAX_CHARS
            )));
        }

        match self
            .inner
            .api
            .post(NICKNAME_PATH, Some(json!({ "nickname": nickname })))
            .await
        {
            Ok(_) => {
                info!("Nickname updated");
                self.revalidate().await;
                Ok(())
            }
            Err(e) if e.is_unauthorized() => Err(AuthError::SessionExpired),
            Err(e) => match e.server_message() {
                Some(message) => Err(AuthError::Rejected(message)),
                None => Err(AuthError::Api(e)),
            },
        }
    }

    fn handle_unauthorized(&self) {
        warn!("Session unrecoverable, clearing state");
        self.settle_anonymous(None, SessionMachineInput::SessionRevoked);
        self.inner.api.navigator().navigate(HOME_ROUTE);
    }

    async fn run_mount_probe(&self, epoch: u64) {
        let outcome = match self.probe().await {
            ProbeOutcome::Failed(e) => {
                debug!(
                    error = %e,
                    delay_ms = self.inner.retry_delay.as_millis() as u64,
                    "Session probe failed, retrying once"
                );
                tokio::time::sleep(self.inner.retry_delay).await;
                if self.current_epoch() != epoch {
                    return;
                }
                self.probe().await
            }
            outcome => outcome,
        };

        match outcome {
            ProbeOutcome::Authenticated(profile) => self.settle_authenticated(Some(epoch), profile),
            ProbeOutcome::NoProfile | ProbeOutcome::Failed(_) => {
                self.settle_anonymous(Some(epoch), SessionMachineInput::ProbeRejected)
            }
        }
    }

    async fn probe(&self) -> ProbeOutcome {
        match self.inner.api.get(ME_PATH).await {
            Ok(response) => match response.json::<Value>().ok().as_ref().and_then(normalize_profile) {
                Some(profile) => ProbeOutcome::Authenticated(profile),
                None => ProbeOutcome::NoProfile,
            },
            Err(e) => ProbeOutcome::Failed(e),
        }
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn advance_epoch(&self) -> u64 {
        let _fsm = self.inner.fsm.lock();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle_authenticated(&self, epoch: Option<u64>, profile: UserProfile) {
        self.apply(
            epoch,
            SessionMachineInput::ProfileLoaded,
            SessionState::Authenticated(profile),
        );
    }

    fn settle_anonymous(&self, epoch: Option<u64>, input: SessionMachineInput) {
        self.apply(epoch, input, SessionState::Anonymous);
    }

    fn apply(&self, epoch: Option<u64>, input: SessionMachineInput, next: SessionState) {
        if let Err(e) = self.transition(epoch, &input, next) {
            warn!(error = %e, "Session state not updated");
        }
    }

    /// Apply `input` and publish `next`, unless `epoch` is stale.
    ///
    /// The epoch check and the write happen under the FSM lock, which
    /// `advance_epoch` also takes.
    fn transition(
        &self,
        epoch: Option<u64>,
        input: &SessionMachineInput,
        next: SessionState,
    ) -> AuthResult<bool> {
        let mut fsm = self.inner.fsm.lock();
        if let Some(epoch) = epoch {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                debug!(epoch, input = ?input, "Dropping stale session update");
                return Ok(false);
            }
        }

        let old_state = fsm.state().clone();
        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;
        debug!(
            old_state = ?old_state,
            new_state = ?fsm.state(),
            "Session state transition"
        );
        self.inner.state_tx.send_replace(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use session_http_client::{
        ApiResponse, ApiResult, ClientConfig, ClientRuntime, HttpTransport, Navigator,
        PreparedRequest, UnauthorizedSignal, REFRESH_PATH,
    };
    use std::collections::{HashMap, VecDeque};

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn reply(&self, path: &str, status: u16, body: &str) -> &Self {
            self.replies
                .lock()
                .entry(path.to_string())
                .or_default()
                .push_back((status, body.to_string()));
            self
        }

        fn calls(&self, path: &str) -> usize {
            self.log.lock().iter().filter(|p| p.as_str() == path).count()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: PreparedRequest) -> ApiResult<ApiResponse> {
            let path = request.url.path().to_string();
            self.log.lock().push(path.clone());
            let reply = self
                .replies
                .lock()
                .get_mut(&path)
                .and_then(|queue| queue.pop_front());
            let (status, body) = reply.unwrap_or((200, "{}".to_string()));
            Ok(ApiResponse {
                status,
                url: request.url,
                body,
            })
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        targets: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &str) {
            self.targets.lock().push(target.to_string());
        }
    }

    struct Harness {
        machine: AuthStateMachine,
        transport: Arc<ScriptedTransport>,
        navigator: Arc<RecordingNavigator>,
        signal: UnauthorizedSignal,
    }

    fn harness() -> Harness {
        let transport = Arc::new(ScriptedTransport::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let signal = UnauthorizedSignal::new();
        let config = ClientConfig::new(
            Url::parse("http://localhost:8080").unwrap(),
            ClientRuntime::Browser {
                identity: device_identity::DeviceIdentity::server(),
            },
        );
        let api = ApiClient::builder(config)
            .transport(transport.clone())
            .navigator(navigator.clone())
            .signal(signal.clone())
            .build()
            .unwrap();

        Harness {
            machine: AuthStateMachine::new(api),
            transport,
            navigator,
            signal,
        }
    }

    const PROFILE: &str = r#"{"id":42,"nickname":"cho"}"#;

    #[tokio::test(start_paused = true)]
    async fn test_mount_probe_success() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        assert!(h.machine.state().is_loading());

        h.machine.mount().await.unwrap();

        let user = h.machine.user().unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.nickname.as_deref(), Some("cho"));
        assert!(h.machine.is_logged_in());
        assert_eq!(h.transport.calls(ME_PATH), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_probe_fails_twice_settles_anonymous_after_one_retry() {
        let h = harness();
        h.transport.reply(ME_PATH, 401, "").reply(ME_PATH, 401, "");

        let started = tokio::time::Instant::now();
        h.machine.mount().await.unwrap();

        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(h.transport.calls(ME_PATH), 2);
        assert!(started.elapsed() >= Duration::from_millis(800));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(h.transport.calls(REFRESH_PATH), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_probe_retry_recovers() {
        let h = harness();
        h.transport.reply(ME_PATH, 500, "").reply(ME_PATH, 200, PROFILE);

        h.machine.mount().await.unwrap();
        assert!(h.machine.is_logged_in());
        assert_eq!(h.transport.calls(ME_PATH), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_probe_without_profile_does_not_retry() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, r#"{"message":"guest"}"#);

        h.machine.mount().await.unwrap();
        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(h.transport.calls(ME_PATH), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_before_retry_leaves_state_untouched() {
        let h = harness();
        h.transport.reply(ME_PATH, 401, "").reply(ME_PATH, 200, PROFILE);

        let handle = h.machine.mount();
        // Let the first probe fail and the retry timer start.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.transport.calls(ME_PATH), 1);

        h.machine.unmount();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(h.machine.state().is_loading());
        assert_eq!(h.transport.calls(ME_PATH), 1);
        assert!(!h.signal.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_epoch_write_is_dropped() {
        let h = harness();
        let epoch = h.machine.current_epoch();
        h.machine.unmount();

        h.machine
            .settle_authenticated(Some(epoch), UserProfile::with_id("1"));
        assert!(h.machine.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_registers_unauthorized_handler() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        h.machine.mount().await.unwrap();
        assert!(h.signal.is_set());

        assert!(h.signal.fire());
        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(*h.navigator.targets.lock(), vec!["/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_only_clears_own_handler() {
        let h = harness();
        h.machine.mount().await.unwrap();
        let replacement = h.signal.set(|| {});

        h.machine.unmount();
        assert!(h.signal.is_set());
        assert!(h.signal.clear_if(replacement));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_resets_session_via_signal() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        h.machine.mount().await.unwrap();
        assert!(h.machine.is_logged_in());

        h.transport
            .reply("/api/v1/auth/sessions", 401, "")
            .reply(REFRESH_PATH, 401, "");
        let api = h.machine.inner.api.clone();
        api.get("/api/v1/auth/sessions").await.unwrap_err();

        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(*h.navigator.targets.lock(), vec!["/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidate_single_probe() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        assert!(h.machine.revalidate().await.is_authenticated());

        h.transport.reply(ME_PATH, 401, "");
        assert_eq!(h.machine.revalidate().await, SessionState::Anonymous);
        assert_eq!(h.transport.calls(ME_PATH), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_events() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);

        assert!(
            !h.machine
                .handle_viewport_event(ViewportEvent::VisibilityChanged { visible: false })
                .await
        );
        assert_eq!(h.transport.calls(ME_PATH), 0);

        assert!(
            h.machine
                .handle_viewport_event(ViewportEvent::VisibilityChanged { visible: true })
                .await
        );
        assert!(h.machine.handle_viewport_event(ViewportEvent::WindowFocused).await);
        assert_eq!(h.transport.calls(ME_PATH), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_forwards_events() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        let (tx, rx) = mpsc::channel(4);
        let task = h.machine.listen(rx);

        tx.send(ViewportEvent::WindowFocused).await.unwrap();
        tx.send(ViewportEvent::VisibilityChanged { visible: false })
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(h.transport.calls(ME_PATH), 1);
        assert!(h.machine.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_transitions() {
        let h = harness();
        let mut rx = h.machine.subscribe();
        h.transport.reply(ME_PATH, 200, PROFILE);

        let _probe = h.machine.mount();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_redirect_navigates_without_state_change() {
        let h = harness();
        h.machine.login_redirect().unwrap();

        assert_eq!(
            *h.navigator.targets.lock(),
            vec!["http://localhost:8080/oauth2/authorization/google"]
        );
        assert!(h.machine.state().is_loading());
        assert_eq!(h.transport.calls(ME_PATH), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_success() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        h.machine.mount().await.unwrap();

        h.machine.logout().await;
        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(h.transport.calls(LOGOUT_PATH), 1);
        assert_eq!(*h.navigator.targets.lock(), vec!["/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_fail_open() {
        let h = harness();
        h.transport.reply(ME_PATH, 200, PROFILE);
        h.machine.mount().await.unwrap();
        h.transport.reply(LOGOUT_PATH, 500, "");

        h.machine.logout().await;
        assert_eq!(h.machine.state(), SessionState::Anonymous);
        assert_eq!(h.navigator.targets.lock().last().map(String::as_str), Some("/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_nickname_validation() {
        let h = harness();
        assert!(matches!(
            h.machine.update_nickname(" a ").await,
            Err(AuthError::InvalidNickname(_))
        ));
        assert!(matches!(
            h.machine.update_nickname(&"가".repeat(21)).await,
            Err(AuthError::InvalidNickname(_))
        ));
        assert_eq!(h.transport.calls(NICKNAME_PATH), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_nickname_refetches_profile() {
        let h = harness();
        h.transport
            .reply(NICKNAME_PATH, 200, "")
            .reply(ME_PATH, 200, r#"{"data":{"id":42,"nickname":"새닉네임"}}"#);

        h.machine.update_nickname("  새닉네임 ").await.unwrap();
        assert_eq!(
            h.machine.user().unwrap().nickname.as_deref(),
            Some("새닉네임")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_nickname_errors() {
        let h = harness();
        h.transport.reply(NICKNAME_PATH, 401, "");
        assert!(matches!(
            h.machine.update_nickname("cho").await,
            Err(AuthError::SessionExpired)
        ));
        assert_eq!(h.transport.calls(REFRESH_PATH), 0);

        h.transport
            .reply(NICKNAME_PATH, 409, r#"{"message":"이미 사용 중인 닉네임입니다."}"#);
        match h.machine.update_nickname("cho").await {
            Err(AuthError::Rejected(message)) => assert_eq!(message, "이미 사용 중인 닉네임입니다."),
            other => panic!("unexpected {:?}", other),
        }

        h.transport.reply(NICKNAME_PATH, 500, "oops");
        assert!(matches!(
            h.machine.update_nickname("cho").await,
            Err(AuthError::Api(_))
        ));
    }
}
