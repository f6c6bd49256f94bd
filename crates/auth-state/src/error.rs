//! Authentication error types.

use session_http_client::ApiError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Nickname failed local validation
    #[error("Invalid nickname: {0}")]
    InvalidNickname(String),

    /// The server no longer accepts the session
    #[error("Session expired")]
    SessionExpired,

    /// The server refused the change and said why
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// Invalid state transition in the session FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Any other API failure
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Api(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(AuthError::Api(ApiError::Transport("reset".into())).is_transient());
        assert!(!AuthError::SessionExpired.is_transient());
        assert!(!AuthError::Rejected("taken".into()).is_transient());
        assert!(!AuthError::InvalidNickname("x".into()).is_transient());
    }

    #[test]
    fn test_display() {
        assert_eq!(AuthError::SessionExpired.to_string(), "Session expired");
        assert_eq!(
            AuthError::Rejected("nickname taken".into()).to_string(),
            "Rejected by server: nickname taken"
        );
    }
}
