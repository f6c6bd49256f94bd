//! Session-aware HTTP client for the TechInsights API.
//!
//! Every request goes through the same pipeline:
//!
//! 1. [`RequestContext`] is resolved against the configured base URL into a
//!    [`PreparedRequest`].
//! 2. Each [`RequestInterceptor`] mutates headers ([`SessionHeaders`] forces
//!    credentials and adds the device id or the edge secret).
//! 3. The [`HttpTransport`] dispatches it.
//! 4. A failure is classified by [`RefreshPolicy`]: maintenance navigation,
//!    plain propagation, the unauthorized signal, or a single
//!    refresh-and-retry cycle.
//!
//! The retry marker lives in the immutable [`Attempt`] carried by the
//! context. A retried context can never classify to another refresh, so the
//! loop is bounded at one refresh and one re-dispatch per request.

mod client;
mod config;
mod context;
mod error;
mod interceptor;
mod navigation;
mod refresh;
mod signal;
mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::{
    ClientConfig, ClientRuntime, EdgeSecret, AUTH_REQUIRED_PATTERNS, HOME_ROUTE, LOGOUT_PATH,
    MAINTENANCE_PATH, ME_PATH, REFRESH_PATH,
};
pub use context::{Attempt, RequestContext};
pub use error::{ApiError, ApiResult};
pub use interceptor::{
    RequestInterceptor, SessionHeaders, AUTH_SECRET_HEADER, DEVICE_ID_HEADER,
    REQUESTED_WITH_HEADER,
};
pub use navigation::{Navigator, TracingNavigator};
pub use refresh::{FailureAction, RefreshMode, RefreshPolicy};
pub use signal::{HandlerToken, UnauthorizedSignal};
pub use transport::{ApiResponse, HttpTransport, PreparedRequest, ReqwestTransport};

/// Re-exported so callers can build contexts without depending on reqwest.
pub use reqwest::Method;
