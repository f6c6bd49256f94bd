use reqwest::Method;
use serde_json::Value;

/// Which dispatch of a logical request this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    /// Re-dispatch after a session refresh. Terminal: never refreshed again.
    Retried,
}

/// Immutable per-call request description.
///
/// `target` is either a path relative to the client's base URL or a fully
/// qualified URL, which is used unchanged.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    target: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    with_credentials: bool,
    attempt: Attempt,
}

impl RequestContext {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            with_credentials: true,
            attempt: Attempt::Initial,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Ask not to send cookies. The session interceptor overrides this.
    pub fn without_credentials(mut self) -> Self {
        self.with_credentials = false;
        self
    }

    /// Consume this context and return its retried copy.
    pub fn into_retry(self) -> Self {
        Self {
            attempt: Attempt::Retried,
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    pub fn is_retried(&self) -> bool {
        self.attempt == Attempt::Retried
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_context_is_initial() {
        let ctx = RequestContext::get("/api/v1/posts");
        assert_eq!(ctx.attempt(), Attempt::Initial);
        assert!(!ctx.is_retried());
        assert!(ctx.with_credentials());
        assert_eq!(ctx.method(), &Method::GET);
    }

    #[test]
    fn test_into_retry_keeps_request() {
        let ctx = RequestContext::post("/api/v1/auth/logout")
            .query("page", 2)
            .json(json!({"a": 1}))
            .header("X-Trace", "t1");

        let retried = ctx.into_retry();
        assert!(retried.is_retried());
        assert_eq!(retried.target(), "/api/v1/auth/logout");
        assert_eq!(retried.query_pairs(), &[("page".to_string(), "2".to_string())]);
        assert_eq!(retried.body(), Some(&json!({"a": 1})));
        assert_eq!(retried.headers().len(), 1);
    }

    #[test]
    fn test_retry_is_idempotent() {
        let ctx = RequestContext::get("/x").into_retry().into_retry();
        assert_eq!(ctx.attempt(), Attempt::Retried);
    }
}
