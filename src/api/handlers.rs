//! HTTP request handlers

use super::types::{
    CredentialRequest, DiagnoseRequest, ErrorResponse, SessionResponse, StateResponse,
    SuccessResponse, TurnResponse, UpdateSessionRequest,
};
use super::AppState;
use crate::engine::{Action, TurnError};
use crate::llm::CredentialError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            patch(update_session).delete(delete_session),
        )
        .route("/api/sessions/:id/select", post(select_session))
        // Engine actions
        .route("/api/sessions/:id/diagnose", post(diagnose))
        .route("/api/sessions/:id/hint", post(hint))
        .route("/api/sessions/:id/metaphor", post(metaphor))
        .route("/api/sessions/:id/give-up", post(give_up))
        .route("/api/sessions/:id/resend", post(resend))
        // Storage and credential
        .route("/api/storage/clear", post(clear_storage))
        .route(
            "/api/credential",
            put(save_credential).delete(reset_credential),
        )
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// State
// ============================================================

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let repo = state.repo.lock().await;
    let active = repo.active_session().cloned();
    let actions_available = active.as_ref().is_some_and(|s| {
        !s.messages.is_empty() && !s.is_solved && !repo.is_analyzing(&s.id)
    });
    let credential_source = state.gateway.credential_source();

    Json(StateResponse {
        sessions: repo.sessions().to_vec(),
        active_session_id: repo.active_session_id().to_string(),
        active_session: active,
        analyzing: repo.analyzing_ids(),
        actions_available,
        has_credential: credential_source.is_some(),
        credential_source,
    })
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    let mut repo = state.repo.lock().await;
    let id = repo.create();
    let session = repo
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::Internal("Created session is missing".to_string()))?;
    Ok(Json(SessionResponse { session }))
}

async fn select_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut repo = state.repo.lock().await;
    if !repo.select(&id) {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let patch = req.into_patch();
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let mut repo = state.repo.lock().await;
    if !repo.update(&id, patch) {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    let session = repo
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;
    Ok(Json(SessionResponse { session }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut repo = state.repo.lock().await;
    if !repo.remove(&id) {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Engine Actions
// ============================================================

async fn diagnose(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DiagnoseRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    run_action(
        &state,
        id,
        Action::Diagnose {
            stuck_point: req.stuck_point,
        },
    )
    .await
}

async fn hint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    run_action(&state, id, Action::Hint).await
}

async fn metaphor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    run_action(&state, id, Action::Metaphor).await
}

async fn give_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    run_action(&state, id, Action::GiveUp).await
}

async fn resend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    run_action(&state, id, Action::Resend).await
}

/// Run the turn on its own task so a dropped connection cannot abandon it
/// halfway and leave the session marked as analyzing.
async fn run_action(
    state: &AppState,
    id: String,
    action: Action,
) -> Result<Json<TurnResponse>, AppError> {
    let engine = state.engine.clone();
    let task_id = id.clone();
    let outcome = tokio::spawn(async move { engine.run(&task_id, action).await })
        .await
        .map_err(|e| AppError::Internal(format!("Turn task failed: {e}")))??;

    let session = state.repo.lock().await.get(&id).cloned();
    Ok(Json(TurnResponse {
        session_id: outcome.session_id,
        reply: outcome.reply,
        is_solved: outcome.is_solved,
        fallback: outcome.failure.is_some(),
        credential_required: outcome.failure.is_some_and(|k| k.needs_credential()),
        retryable: outcome.failure.is_some_and(|k| k.is_retryable()),
        session,
    }))
}

// ============================================================
// Storage and Credential
// ============================================================

async fn clear_storage(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.repo.lock().await.clear();
    state.gateway.rebuild();
    Json(SuccessResponse { success: true })
}

async fn save_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.gateway.save_credential(&req.api_key)?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn reset_credential(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.gateway.reset_credential()?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn get_version() -> &'static str {
    concat!("elis ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::SessionNotFound(_) => AppError::NotFound(e.to_string()),
            TurnError::Busy => AppError::Conflict(e.to_string()),
            TurnError::EmptyProblem | TurnError::EmptyStuckPoint | TurnError::NothingToResend => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Empty => AppError::BadRequest(e.to_string()),
            CredentialError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
