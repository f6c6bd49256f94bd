//! HTTP client error types.

use thiserror::Error;

/// Error returned by every request function.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The request exceeded the client timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Connection, TLS or protocol failure before a status was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &url::Url) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_service_unavailable(&self) -> bool {
        self.status() == Some(503)
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - HTTP 5xx and 429 responses
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout { .. } | ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Json(_) | ApiError::InvalidUrl(_) => false,
        }
    }

    /// Server-supplied `message` field from a JSON error body.
    pub fn server_message(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
