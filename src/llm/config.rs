//! Gateway configuration and credential resolution

use super::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::LlmError;
use serde::Serialize;

/// Environment variable holding the default credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the model gateway
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Credential from the environment, used when the user has not saved one
    pub env_api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            env_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            env_api_key: std::env::var(API_KEY_ENV).ok(),
            model: std::env::var("ELIS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("ELIS_GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Where the resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Saved by the user
    Override,
    /// Environment default
    Environment,
}

/// Resolve the credential: user override, then environment default, then fail.
///
/// Blank values count as absent at both levels.
pub fn resolve_credential(
    user_override: Option<&str>,
    config: &LlmConfig,
) -> Result<(String, CredentialSource), LlmError> {
    let non_blank = |key: &str| {
        let key = key.trim();
        (!key.is_empty()).then(|| key.to_string())
    };

    if let Some(key) = user_override.and_then(non_blank) {
        return Ok((key, CredentialSource::Override));
    }
    if let Some(key) = config.env_api_key.as_deref().and_then(non_blank) {
        return Ok((key, CredentialSource::Environment));
    }
    Err(LlmError::missing_credential(format!(
        "Gemini API key is missing. Save one in the app or set {API_KEY_ENV}."
    )))
}
