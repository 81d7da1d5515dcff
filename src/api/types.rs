//! API request and response types

use crate::llm::CredentialSource;
use crate::session::{Session, SessionPatch};
use serde::{Deserialize, Serialize};

/// Request to edit a session's problem text, draft stuck point or title
#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    #[serde(alias = "problemCode")]
    pub problem_code: Option<String>,
    #[serde(alias = "stuckPoint")]
    pub stuck_point: Option<String>,
}

impl UpdateSessionRequest {
    pub fn into_patch(self) -> SessionPatch {
        let mut patch = SessionPatch::default();
        patch.title = self.title;
        patch.problem_code = self.problem_code;
        patch.stuck_point = self.stuck_point;
        patch
    }
}

/// Request to submit a stuck point for diagnosis
#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(alias = "stuckPoint")]
    pub stuck_point: String,
}

/// Request to save a user-supplied API key
#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

/// Everything the UI renders from
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub sessions: Vec<Session>,
    /// Raw pointer; may name a session that no longer exists
    pub active_session_id: String,
    /// Effective active session (the selected one, else the newest)
    pub active_session: Option<Session>,
    pub analyzing: Vec<String>,
    /// Whether resend, hint, metaphor and give-up are offered for the active session
    pub actions_available: bool,
    pub has_credential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_source: Option<CredentialSource>,
}

/// Response with a single session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

/// Response for a finished engine action
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub reply: String,
    pub is_solved: bool,
    /// The model call failed and the fallback reply was stored
    pub fallback: bool,
    /// The failure was caused by a missing or rejected API key
    pub credential_required: bool,
    /// The failure looks transient, so resending later is likely to work
    pub retryable: bool,
    /// Absent when the session was deleted while the call was in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

/// Response for actions with no payload
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
