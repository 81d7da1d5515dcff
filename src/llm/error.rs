//! Model call failures

use thiserror::Error;

/// A failed model call and why it failed
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transport-level failure before a status was received
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::MissingCredential, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from the provider
    pub fn from_status(status: u16, detail: &str) -> Self {
        let kind = LlmErrorKind::from_status(status);
        let message = match kind {
            LlmErrorKind::InvalidRequest => format!("Invalid request: {detail}"),
            LlmErrorKind::Auth => format!("Authentication failed: {detail}"),
            LlmErrorKind::RateLimit => format!("Rate limit exceeded: {detail}"),
            LlmErrorKind::ServerError => format!("Server error: {detail}"),
            _ => format!("HTTP {status}: {detail}"),
        };
        Self { kind, message }
    }
}

/// What went wrong, as far as the user can act on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Timeouts, refused connections, truncated bodies
    Network,
    /// 429 or exhausted quota
    RateLimit,
    /// 5xx
    ServerError,
    /// 401 / 403: the key was rejected
    Auth,
    /// 400, which Gemini also returns for malformed keys
    InvalidRequest,
    /// No key saved and none in the environment
    MissingCredential,
    Unknown,
}

impl LlmErrorKind {
    fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Transient failures where pressing Resend later is likely to work.
    /// Reported to the client with the turn; nothing retries automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }

    /// Failures the user fixes by supplying a (different) key
    pub fn needs_credential(self) -> bool {
        matches!(self, Self::MissingCredential | Self::Auth)
    }
}
