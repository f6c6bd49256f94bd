//! Wire transport: the seam between the request pipeline and the network.

use crate::{ApiError, ApiResult, ClientConfig, RequestContext};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// A fully resolved request, after interceptors have run.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Attach session cookies.
    pub with_credentials: bool,
}

impl PreparedRequest {
    pub(crate) fn from_context(ctx: &RequestContext, config: &ClientConfig) -> ApiResult<Self> {
        let mut url = config.resolve(ctx.target())?;
        if !ctx.query_pairs().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in ctx.query_pairs() {
                pairs.append_pair(key, value);
            }
        }

        Ok(Self {
            method: ctx.method().clone(),
            url,
            headers: ctx.headers().to_vec(),
            body: ctx.body().cloned(),
            with_credentials: ctx.with_credentials(),
        })
    }

    /// Set a header, replacing any existing value (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response with its body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: Url,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let body = self.body.trim();
        let body = if body.is_empty() { "null" } else { body };
        Ok(serde_json::from_str(body)?)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request. Non-2xx statuses are returned, not raised.
    async fn execute(&self, request: PreparedRequest) -> ApiResult<ApiResponse>;
}

/// reqwest-backed transport with an explicit cookie jar.
///
/// Cookies are attached only to requests that carry credentials, and every
/// `Set-Cookie` response header is stored back into the jar.
pub struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        Self::with_jar(timeout, Arc::new(Jar::default()))
    }

    pub fn with_jar(timeout: Duration, jar: Arc<Jar>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client, jar })
    }

    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Seed the jar with a `name=value` cookie scoped to `url`.
    pub fn add_cookie(&self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: PreparedRequest) -> ApiResult<ApiResponse> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
            with_credentials,
        } = request;

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if with_credentials {
            if let Some(cookies) = self.jar.cookies(&url) {
                builder = builder.header(COOKIE, cookies);
            }
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, &url))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let mut set_cookies = response.headers().get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_some() {
            trace!(url = %final_url, "Storing response cookies");
            self.jar.set_cookies(&mut set_cookies, &final_url);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, &url))?;

        Ok(ApiResponse {
            status,
            url: final_url,
            body,
        })
    }
}
