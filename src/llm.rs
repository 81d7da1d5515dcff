//! LLM provider abstraction
//!
//! The rest of the crate only needs "turns in, text or failure out"; this
//! module hides the Gemini wire format and credential handling behind
//! [`LlmService`].

mod config;
mod error;
mod gateway;
mod gemini;
mod types;

pub use config::{CredentialSource, LlmConfig};
pub use error::{LlmError, LlmErrorKind};
pub use gateway::{CredentialError, ModelGateway};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Wraps a provider and records one structured event per call
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration_ms = start.elapsed().as_millis();
        let outgoing_chars = request.outgoing_text().map_or(0, |t| t.chars().count());

        match &result {
            Ok(response) if !response.end_turn => tracing::warn!(
                model = %self.model_id,
                duration_ms = %duration_ms,
                output_tokens = response.usage.output_tokens,
                "Reply cut short before the model finished"
            ),
            Ok(response) => tracing::info!(
                model = %self.model_id,
                duration_ms = %duration_ms,
                turns = request.messages.len(),
                outgoing_chars,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model reply received"
            ),
            Err(e) => tracing::error!(
                model = %self.model_id,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                needs_credential = e.kind.needs_credential(),
                error = %e.message,
                "Model call failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
