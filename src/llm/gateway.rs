//! Credential-aware model gateway
//!
//! Holds the provider built from the currently resolved credential. The
//! provider is rebuilt whenever the stored credential changes; in between,
//! every call goes to the same instance.

use super::config::{resolve_credential, CredentialSource, LlmConfig};
use super::gemini::GeminiService;
use super::{LlmError, LlmRequest, LlmResponse, LlmService, LoggingService};
use crate::store::{PersistentStore, StoreError, CREDENTIAL_KEY};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key must not be empty")]
    Empty,
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Resolved {
    service: Arc<dyn LlmService>,
    source: Option<CredentialSource>,
}

pub struct ModelGateway {
    config: LlmConfig,
    store: PersistentStore,
    resolved: RwLock<Resolved>,
}

impl ModelGateway {
    pub fn new(config: LlmConfig, store: PersistentStore) -> Self {
        let resolved = Self::resolve(&config, &store);
        Self {
            config,
            store,
            resolved: RwLock::new(resolved),
        }
    }

    fn resolve(config: &LlmConfig, store: &PersistentStore) -> Resolved {
        let user_override = store.load_text(CREDENTIAL_KEY);

        let built = resolve_credential(user_override.as_deref(), config).and_then(
            |(key, source)| {
                let service = GeminiService::new(key, &config.model, &config.base_url)?;
                Ok((service, source))
            },
        );

        match built {
            Ok((service, source)) => {
                tracing::info!(model = %config.model, source = ?source, "Model gateway configured");
                Resolved {
                    service: Arc::new(LoggingService::new(Arc::new(service))),
                    source: Some(source),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model gateway has no usable credential");
                Resolved {
                    service: Arc::new(Unconfigured {
                        model_id: config.model.clone(),
                        reason: e.message,
                    }),
                    source: None,
                }
            }
        }
    }

    /// Re-run credential resolution against the store
    pub fn rebuild(&self) {
        let resolved = Self::resolve(&self.config, &self.store);
        match self.resolved.write() {
            Ok(mut guard) => *guard = resolved,
            Err(poisoned) => *poisoned.into_inner() = resolved,
        }
    }

    pub fn credential_source(&self) -> Option<CredentialSource> {
        match self.resolved.read() {
            Ok(guard) => guard.source,
            Err(poisoned) => poisoned.into_inner().source,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential_source().is_some()
    }

    /// Store a user-supplied key and switch to it
    pub fn save_credential(&self, api_key: &str) -> Result<(), CredentialError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CredentialError::Empty);
        }
        self.store.save_text(CREDENTIAL_KEY, api_key)?;
        self.rebuild();
        Ok(())
    }

    /// Forget the user-supplied key, falling back to the environment default
    pub fn reset_credential(&self) -> Result<(), CredentialError> {
        self.store.remove(CREDENTIAL_KEY)?;
        self.rebuild();
        Ok(())
    }

    fn current(&self) -> Arc<dyn LlmService> {
        match self.resolved.read() {
            Ok(guard) => guard.service.clone(),
            Err(poisoned) => poisoned.into_inner().service.clone(),
        }
    }
}

#[async_trait]
impl LlmService for ModelGateway {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        // Clone out of the lock so it is not held across the call
        let service = self.current();
        service.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Stand-in used while no credential is available
struct Unconfigured {
    model_id: String,
    reason: String,
}

#[async_trait]
impl LlmService for Unconfigured {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::missing_credential(self.reason.clone()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, LlmMessage};

    fn request() -> LlmRequest {
        LlmRequest {
            messages: vec![LlmMessage::user("hello")],
            max_tokens: Some(16),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_fails_at_call_time() {
        let gateway = ModelGateway::new(LlmConfig::default(), PersistentStore::in_memory());
        assert!(!gateway.has_credential());

        let err = gateway.complete(&request()).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::MissingCredential);
        assert!(err.kind.needs_credential());
    }

    #[test]
    fn test_save_and_reset_credential() {
        let store = PersistentStore::in_memory();
        let config = LlmConfig {
            env_api_key: Some("env-key".to_string()),
            ..LlmConfig::default()
        };
        let gateway = ModelGateway::new(config, store.clone());
        assert_eq!(gateway.credential_source(), Some(CredentialSource::Environment));

        gateway.save_credential("  user-key ").unwrap();
        assert_eq!(store.load_text(CREDENTIAL_KEY).as_deref(), Some("user-key"));
        assert_eq!(gateway.credential_source(), Some(CredentialSource::Override));

        gateway.reset_credential().unwrap();
        assert_eq!(store.load_text(CREDENTIAL_KEY), None);
        assert_eq!(gateway.credential_source(), Some(CredentialSource::Environment));
    }

    #[test]
    fn test_blank_credential_rejected() {
        let store = PersistentStore::in_memory();
        let gateway = ModelGateway::new(LlmConfig::default(), store.clone());

        assert!(matches!(
            gateway.save_credential("   "),
            Err(CredentialError::Empty)
        ));
        assert_eq!(store.load_text(CREDENTIAL_KEY), None);
        assert!(!gateway.has_credential());
    }

    #[test]
    fn test_rebuild_picks_up_external_clear() {
        let store = PersistentStore::in_memory();
        let gateway = ModelGateway::new(LlmConfig::default(), store.clone());
        gateway.save_credential("user-key").unwrap();
        assert!(gateway.has_credential());

        store.clear().unwrap();
        gateway.rebuild();
        assert!(!gateway.has_credential());
    }
}
