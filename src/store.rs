//! Persistent key-value storage
//!
//! The rest of the crate only sees string keys mapped to string values.
//! [`PersistentStore`] layers typed JSON load/save on top of whichever
//! backend is plugged in.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Key holding the ordered session collection (JSON array)
pub const SESSIONS_KEY: &str = "elis_sessions";
/// Key holding the active session id (plain text)
pub const ACTIVE_SESSION_KEY: &str = "elis_active_session";
/// Key holding the user-supplied model credential (plain text)
pub const CREDENTIAL_KEY: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw string key-value capability
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Drop every key
    fn clear(&self) -> StoreResult<()>;
}

/// Typed adapter over a [`KeyValueStore`]
///
/// Reads never fail: a missing key, a backend error or an undecodable value
/// all yield the caller's default.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// In-memory store, mostly for tests
    #[allow(dead_code)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.load_text(key) else {
            return default;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable stored value");
                default
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }

    pub fn load_text(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage read failed");
                None
            }
        }
    }

    pub fn save_text(&self, key: &str, value: &str) -> StoreResult<()> {
        self.backend.set(key, value)
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.backend.remove(key)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.backend.clear()
    }
}
