//! Session data model
//!
//! A session is one diagnostic conversation: the problem text the user pasted,
//! their latest stuck-point draft, and the ordered message history.

use crate::title::{self, DEFAULT_TITLE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a session's history. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Persisted session record
///
/// Field names serialize in camelCase and `createdAt` as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub problem_code: String,
    /// Last submitted stuck point. Advisory only; the history is authoritative.
    pub stuck_point: String,
    pub messages: Vec<Message>,
    pub is_solved: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            problem_code: String::new(),
            stuck_point: String::new(),
            messages: Vec::new(),
            is_solved: false,
            created_at: Utc::now(),
        }
    }

    /// Index of the most recent user message, if any
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_user)
    }

    /// Merge a patch. The title is recomputed from the incoming fields before
    /// anything is overwritten.
    pub fn apply(&mut self, patch: SessionPatch) {
        let title = title::next_title(self, &patch);

        let SessionPatch {
            title: _,
            problem_code,
            stuck_point,
            messages,
            solved,
        } = patch;

        if let Some(problem_code) = problem_code {
            self.problem_code = problem_code;
        }
        if let Some(stuck_point) = stuck_point {
            self.stuck_point = stuck_point;
        }
        if let Some(messages) = messages {
            self.messages = messages;
        }
        if solved {
            self.is_solved = true;
        }
        self.title = title;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// The fields of a [`Session`] that may change after creation.
///
/// `id` and `createdAt` are not representable here. History replacement and
/// the solved flag are only reachable through [`SessionPatch::messages`] and
/// [`SessionPatch::mark_solved`], and the flag can only move to `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub problem_code: Option<String>,
    pub stuck_point: Option<String>,
    messages: Option<Vec<Message>>,
    solved: bool,
}

impl SessionPatch {
    pub fn problem_code(text: impl Into<String>) -> Self {
        Self {
            problem_code: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn stuck_point(text: impl Into<String>) -> Self {
        Self {
            stuck_point: Some(text.into()),
            ..Self::default()
        }
    }

    /// Replace the whole history
    #[must_use]
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn mark_solved(mut self) -> Self {
        self.solved = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new();
        assert_eq!(session.title, DEFAULT_TITLE);
        assert!(session.messages.is_empty());
        assert!(!session.is_solved);
        assert!(!session.id.is_empty());
        assert_ne!(Session::new().id, session.id);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut session = Session::new();
        session.messages.push(Message::user("why?"));
        let json = serde_json::to_value(&session).unwrap();

        assert!(json.get("problemCode").is_some());
        assert!(json.get("stuckPoint").is_some());
        assert_eq!(json["isSolved"], false);
        assert!(json["createdAt"].is_i64());
        assert_eq!(json["messages"][0]["role"], "user");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(
            back.created_at.timestamp_millis(),
            session.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut session = Session::new();
        session.apply(SessionPatch::problem_code("print(1)"));
        session.apply(SessionPatch::default().messages(vec![Message::user("a")]));

        assert_eq!(session.problem_code, "print(1)");
        assert_eq!(session.stuck_point, "");
        assert_eq!(session.messages.len(), 1);
        assert!(!session.is_solved);
    }

    #[test]
    fn test_solved_flag_only_moves_forward() {
        let mut session = Session::new();
        session.apply(SessionPatch::default().mark_solved());
        assert!(session.is_solved);

        session.apply(SessionPatch::problem_code("changed"));
        assert!(session.is_solved);
    }

    #[test]
    fn test_last_user_index() {
        let mut session = Session::new();
        assert_eq!(session.last_user_index(), None);

        session.messages = vec![
            Message::user("A"),
            Message::assistant("B"),
            Message::user("C"),
            Message::assistant("D"),
        ];
        assert_eq!(session.last_user_index(), Some(2));
    }
}
