use crate::refresh::RefreshController;
use crate::{
    ApiError, ApiResponse, ApiResult, ClientConfig, FailureAction, HttpTransport, Navigator,
    PreparedRequest, RefreshPolicy, ReqwestTransport, RequestContext, RequestInterceptor,
    SessionHeaders, TracingNavigator, UnauthorizedSignal,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves, intercepts and sends one dispatch. No failure policy.
pub(crate) struct Dispatcher {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl Dispatcher {
    pub(crate) fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        interceptors: Vec<Arc<dyn RequestInterceptor>>,
    ) -> Self {
        Self {
            config,
            transport,
            interceptors,
        }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) async fn dispatch(&self, ctx: &RequestContext) -> ApiResult<ApiResponse> {
        let mut request = PreparedRequest::from_context(ctx, &self.config)?;
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request);
        }

        debug!(
            method = %request.method,
            url = %request.url,
            attempt = ?ctx.attempt(),
            "Dispatching request"
        );

        let response = self.transport.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                status: response.status,
                url: response.url.to_string(),
                body: response.body,
            })
        }
    }
}

struct Inner {
    dispatcher: Arc<Dispatcher>,
    policy: RefreshPolicy,
    refresher: RefreshController,
    signal: UnauthorizedSignal,
    navigator: Arc<dyn Navigator>,
}

/// Shared API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    extra_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    signal: Option<UnauthorizedSignal>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add an interceptor that runs after [`SessionHeaders`].
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.extra_interceptors.push(interceptor);
        self
    }

    pub fn signal(mut self, signal: UnauthorizedSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Defaults: reqwest transport with a fresh cookie jar, a new signal slot,
    /// and [`TracingNavigator`].
    pub fn build(self) -> ApiResult<ApiClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.timeout)?),
        };
        let signal = self.signal.unwrap_or_default();
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TracingNavigator));

        let mut interceptors: Vec<Arc<dyn RequestInterceptor>> =
            vec![Arc::new(SessionHeaders::new(self.config.runtime.clone()))];
        interceptors.extend(self.extra_interceptors);

        let policy = RefreshPolicy::new(
            self.config.auth_required_patterns.clone(),
            self.config.runtime.is_browser(),
        );
        let refresher = RefreshController::new(
            self.config.refresh_mode,
            signal.clone(),
            navigator.clone(),
        );

        Ok(ApiClient {
            inner: Arc::new(Inner {
                dispatcher: Arc::new(Dispatcher::new(self.config, transport, interceptors)),
                policy,
                refresher,
                signal,
                navigator,
            }),
        })
    }
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            transport: None,
            extra_interceptors: Vec::new(),
            signal: None,
            navigator: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.dispatcher.config()
    }

    pub fn signal(&self) -> &UnauthorizedSignal {
        &self.inner.signal
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Dispatch `ctx`, applying the failure policy.
    ///
    /// At most one refresh call and one re-dispatch happen per call.
    pub async fn request(&self, ctx: RequestContext) -> ApiResult<ApiResponse> {
        let mut ctx = ctx;
        loop {
            let error = match self.inner.dispatcher.dispatch(&ctx).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let url = self
                .config()
                .resolve(ctx.target())
                .map(|u| u.to_string())
                .unwrap_or_else(|_| ctx.target().to_string());

            match self.inner.policy.classify(&ctx, &url, &error) {
                FailureAction::Propagate => return Err(error),
                FailureAction::Maintenance => {
                    warn!(url = %url, "Service unavailable");
                    if self.config().runtime.is_browser() {
                        self.inner.navigator.navigate(&self.config().maintenance_path);
                    }
                    return Err(error);
                }
                FailureAction::Unauthorized => {
                    warn!(url = %url, "Session refresh rejected");
                    self.inner.signal.fire();
                    return Err(error);
                }
                FailureAction::RefreshAndRetry => {
                    debug!(url = %url, "Unauthorized, refreshing session before retry");
                    ctx = ctx.into_retry();
                    if !self.inner.refresher.refresh(&self.inner.dispatcher).await {
                        return Err(error);
                    }
                }
            }
        }
    }

    pub async fn request_json<T: DeserializeOwned>(&self, ctx: RequestContext) -> ApiResult<T> {
        self.request(ctx).await?.json()
    }

    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(RequestContext::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> ApiResult<ApiResponse> {
        self.request(with_body(RequestContext::post(path), body)).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> ApiResult<ApiResponse> {
        self.request(with_body(RequestContext::put(path), body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(RequestContext::delete(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request_json(RequestContext::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request_json(RequestContext::post(path).json(body))
            .await
    }
}

fn with_body(ctx: RequestContext, body: Option<Value>) -> RequestContext {
    match body {
        Some(body) => ctx.json(body),
        None => ctx,
    }
}
