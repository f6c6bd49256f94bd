//! Pre-dispatch header mutation.

use crate::{ClientRuntime, PreparedRequest};
use std::sync::OnceLock;
use tracing::debug;

pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const DEVICE_ID_HEADER: &str = "X-Device-Id";
pub const AUTH_SECRET_HEADER: &str = "x-auth-secret";

/// Runs before every dispatch, including retries and the refresh call.
///
/// Implementations only touch the request in place; they must not block.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut PreparedRequest);
}

/// Default interceptor: credentials plus runtime-specific identity headers.
///
/// - credentials are always sent, whatever the call asked for
/// - browser: `X-Requested-With: XMLHttpRequest`, and `X-Device-Id` when
///   the device id is non-empty
/// - server: `x-auth-secret` when a secret is configured
pub struct SessionHeaders {
    runtime: ClientRuntime,
    device_id: OnceLock<String>,
}

impl SessionHeaders {
    pub fn new(runtime: ClientRuntime) -> Self {
        Self {
            runtime,
            device_id: OnceLock::new(),
        }
    }

    fn device_id(&self) -> &str {
        self.device_id.get_or_init(|| match &self.runtime {
            ClientRuntime::Browser { identity } => identity.device_id(),
            ClientRuntime::Server { .. } => String::new(),
        })
    }
}

impl RequestInterceptor for SessionHeaders {
    fn intercept(&self, request: &mut PreparedRequest) {
        request.with_credentials = true;

        match &self.runtime {
            ClientRuntime::Browser { .. } => {
                request.set_header(REQUESTED_WITH_HEADER, "XMLHttpRequest");
                let device_id = self.device_id();
                if !device_id.is_empty() {
                    request.set_header(DEVICE_ID_HEADER, device_id);
                }
            }
            ClientRuntime::Server { auth_secret } => {
                if let Some(secret) = auth_secret {
                    debug!(masked = %secret.masked(), "Attaching edge secret");
                    request.set_header(AUTH_SECRET_HEADER, secret.expose());
                }
            }
        }
    }
}
