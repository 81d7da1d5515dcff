//! HTTP API for ELIS
//!
//! One route per UI command. Handlers hold the repository lock only for the
//! duration of a read or a single mutation; engine actions take and release it
//! themselves.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::engine::DiagnosticEngine;
use crate::llm::{LlmService, ModelGateway};
use crate::repository::SessionRepository;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Mutex<SessionRepository>>,
    pub engine: DiagnosticEngine,
    pub gateway: Arc<ModelGateway>,
}

impl AppState {
    /// `llm` serves engine turns; in production it is the gateway itself
    pub fn new(repo: SessionRepository, gateway: Arc<ModelGateway>, llm: Arc<dyn LlmService>) -> Self {
        let repo = Arc::new(Mutex::new(repo));
        Self {
            engine: DiagnosticEngine::new(repo.clone(), llm),
            repo,
            gateway,
        }
    }
}
