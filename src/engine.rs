//! Diagnostic engine
//!
//! Runs the five user actions against a session. Each turn has three phases:
//! validate and persist the visible user turn under the repository lock, call
//! the model with the lock released, then reacquire the lock to append the
//! reply. The in-flight flag is set for exactly the duration of the call.

mod turn;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use turn::{Action, TurnError};

use turn::{complete_turn, plan_turn};

use crate::llm::{LlmErrorKind, LlmService};
use crate::repository::SessionRepository;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// What a finished turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply: String,
    /// The session's solved flag after the turn
    pub is_solved: bool,
    /// Set when the fallback reply was substituted
    pub failure: Option<LlmErrorKind>,
}

#[derive(Clone)]
pub struct DiagnosticEngine {
    repo: Arc<Mutex<SessionRepository>>,
    llm: Arc<dyn LlmService>,
}

impl DiagnosticEngine {
    pub fn new(repo: Arc<Mutex<SessionRepository>>, llm: Arc<dyn LlmService>) -> Self {
        Self { repo, llm }
    }

    /// Run one action to completion.
    ///
    /// Validation failures return before anything is stored or sent. Model
    /// failures do not surface as errors; the fallback reply is stored and
    /// reported through [`TurnOutcome::failure`].
    pub async fn run(&self, session_id: &str, action: Action) -> Result<TurnOutcome, TurnError> {
        let plan = {
            let mut repo = self.repo.lock().await;
            let session = repo
                .get(session_id)
                .ok_or_else(|| TurnError::SessionNotFound(session_id.to_string()))?;
            if repo.is_analyzing(session_id) {
                return Err(TurnError::Busy);
            }
            let plan = plan_turn(session, action)?;

            repo.begin_analysis(session_id);
            if let Some(patch) = plan.pre_call.clone() {
                repo.update(session_id, patch);
            }
            plan
        };

        tracing::info!(
            session_id = %session_id,
            action = plan.action,
            turns = plan.request.messages.len(),
            "Starting diagnostic turn"
        );

        let start = Instant::now();
        let result = self.llm.complete(&plan.request).await;
        let action = plan.action;

        let mut repo = self.repo.lock().await;
        let done = complete_turn(plan, result);
        let stored = repo.update(session_id, done.patch);
        repo.end_analysis(session_id);

        if !stored {
            tracing::warn!(session_id = %session_id, action, "Session removed during turn; reply dropped");
        }

        let is_solved = repo.get(session_id).is_some_and(|s| s.is_solved);
        match done.failure {
            Some(kind) => tracing::warn!(
                session_id = %session_id,
                action,
                kind = ?kind,
                duration_ms = %start.elapsed().as_millis(),
                "Diagnostic turn fell back"
            ),
            None => tracing::info!(
                session_id = %session_id,
                action,
                marked_solved = done.marked_solved,
                solved = is_solved,
                duration_ms = %start.elapsed().as_millis(),
                "Diagnostic turn completed"
            ),
        }

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            reply: done.reply.content,
            is_solved,
            failure: done.failure,
        })
    }
}
