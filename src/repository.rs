//! Session repository
//!
//! Owns the ordered session collection (newest first) and the active-session
//! pointer. Every mutation writes through to the [`PersistentStore`]; reads
//! never touch storage.

use crate::session::{Session, SessionPatch};
use crate::store::{PersistentStore, ACTIVE_SESSION_KEY, SESSIONS_KEY};
use std::collections::HashSet;

pub struct SessionRepository {
    store: PersistentStore,
    sessions: Vec<Session>,
    /// Empty when no session has been selected
    active_session_id: String,
    /// Sessions with a model call in flight. Never persisted.
    analyzing: HashSet<String>,
}

impl SessionRepository {
    /// Restore state from the store, falling back to an empty repository
    pub fn load(store: PersistentStore) -> Self {
        let sessions: Vec<Session> = store.load(SESSIONS_KEY, Vec::new());
        let active_session_id = store.load_text(ACTIVE_SESSION_KEY).unwrap_or_default();

        tracing::info!(
            sessions = sessions.len(),
            active = %active_session_id,
            "Session repository loaded"
        );

        Self {
            store,
            sessions,
            active_session_id,
            analyzing: HashSet::new(),
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The raw pointer as stored, which may name a session that no longer exists
    pub fn active_session_id(&self) -> &str {
        &self.active_session_id
    }

    /// The session the UI should show: the selected one, else the first one
    pub fn active_session(&self) -> Option<&Session> {
        self.get(&self.active_session_id)
            .or_else(|| self.sessions.first())
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Insert a fresh session at the front and make it active
    pub fn create(&mut self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        self.sessions.insert(0, session);
        self.active_session_id.clone_from(&id);

        self.persist_sessions();
        self.persist_active();
        tracing::info!(session_id = %id, "Session created");
        id
    }

    /// Point the active session at `id`. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            tracing::debug!(session_id = %id, "Ignoring select of unknown session");
            return false;
        }
        self.active_session_id = id.to_string();
        self.persist_active();
        true
    }

    /// Merge `patch` into the session with `id`. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, patch: SessionPatch) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            tracing::debug!(session_id = %id, "Ignoring update of unknown session");
            return false;
        };
        session.apply(patch);
        self.persist_sessions();
        true
    }

    /// Delete the session with `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            tracing::debug!(session_id = %id, "Ignoring removal of unknown session");
            return false;
        }
        self.analyzing.remove(id);
        self.persist_sessions();

        if self.active_session_id == id {
            self.active_session_id = self
                .sessions
                .first()
                .map(|s| s.id.clone())
                .unwrap_or_default();
            self.persist_active();
        }

        tracing::info!(session_id = %id, "Session removed");
        true
    }

    /// Wipe every stored key, including the credential, and reset in-memory state
    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear storage");
        }
        self.sessions.clear();
        self.active_session_id.clear();
        self.analyzing.clear();
        tracing::info!("Storage cleared");
    }

    pub fn is_analyzing(&self, id: &str) -> bool {
        self.analyzing.contains(id)
    }

    pub fn analyzing_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.analyzing.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Mark a turn as in flight. Returns false if one already is.
    pub fn begin_analysis(&mut self, id: &str) -> bool {
        self.analyzing.insert(id.to_string())
    }

    pub fn end_analysis(&mut self, id: &str) {
        self.analyzing.remove(id);
    }

    fn persist_sessions(&self) {
        if let Err(e) = self.store.save(SESSIONS_KEY, &self.sessions) {
            tracing::error!(error = %e, "Failed to persist sessions");
        }
    }

    fn persist_active(&self) {
        if let Err(e) = self.store.save_text(ACTIVE_SESSION_KEY, &self.active_session_id) {
            tracing::error!(error = %e, "Failed to persist active session id");
        }
    }
}
