//! Shared error type across authgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Caller must (re-)authenticate.
    AuthFailed,
    /// Authenticated but not allowed by the access list.
    Forbidden,
    /// Invalid input / malformed configuration.
    BadRequest,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, AuthGateError>;

/// Unified error type used by core and gateway.
///
/// Session codec failures keep their concrete variant for logs, but all of
/// them collapse to [`ClientCode::AuthFailed`] on the way out.
#[derive(Debug, Error)]
pub enum AuthGateError {
    /// No session cookie on the request (never logged in).
    #[error("no session")]
    NoSession,
    #[error("token is not valid base64: {0}")]
    Decode(String),
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    /// Tag verification failed: tampered token or wrong key.
    #[error("token authentication failed")]
    Authentication,
    #[error("session payload invalid: {0}")]
    Deserialize(String),
    #[error("session expired")]
    ExpiredSession,
    #[error("unable to parse '{pattern}' as regular expression: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("auth failed")]
    AuthFailed,
    /// Request body or parameters could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AuthGateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            AuthGateError::NoSession
            | AuthGateError::Decode(_)
            | AuthGateError::MalformedToken(_)
            | AuthGateError::Authentication
            | AuthGateError::Deserialize(_)
            | AuthGateError::ExpiredSession
            | AuthGateError::AuthFailed => ClientCode::AuthFailed,
            AuthGateError::InvalidPattern { .. }
            | AuthGateError::Config(_)
            | AuthGateError::BadRequest(_) => ClientCode::BadRequest,
            AuthGateError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        AuthGateError::Config(msg.into())
    }
}
