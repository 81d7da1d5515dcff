//! Session title inference
//!
//! Titles are derived from the first non-blank line of the stuck point
//! (preferred) or of the problem code, and only while the session still
//! carries the placeholder title.

use crate::session::{Session, SessionPatch};

/// Placeholder title for a freshly created session
pub const DEFAULT_TITLE: &str = "New Session";

const MAX_TITLE_CHARS: usize = 40;
const ELLIPSIS: &str = "...";

/// Leading comment openers dropped from code-derived titles
const COMMENT_OPENERS: &[&str] = &["//", "#", "/*"];

/// Compute the title a session should carry after `patch` is merged.
///
/// An explicit title in the patch always wins. Otherwise a non-empty stuck
/// point names the session when the title is still the placeholder or no stuck
/// point was recorded before; problem code only names a session that has no
/// stuck point at all.
pub fn next_title(session: &Session, patch: &SessionPatch) -> String {
    if let Some(title) = patch.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return title.to_string();
    }

    let is_placeholder = session.title == DEFAULT_TITLE;
    let incoming_stuck = patch.stuck_point.as_deref().filter(|s| !s.is_empty());

    if let Some(stuck_point) = incoming_stuck {
        if is_placeholder || session.stuck_point.is_empty() {
            if let Some(title) = from_stuck_point(stuck_point) {
                return title;
            }
        }
    } else if is_placeholder && session.stuck_point.is_empty() {
        if let Some(title) = patch
            .problem_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(from_problem_code)
        {
            return title;
        }
    }

    session.title.clone()
}

fn from_stuck_point(text: &str) -> Option<String> {
    first_non_blank_line(text).map(|line| clip(line.trim()))
}

fn from_problem_code(code: &str) -> Option<String> {
    let line = first_non_blank_line(code)?.trim_start();
    let line = COMMENT_OPENERS
        .iter()
        .find_map(|opener| line.strip_prefix(opener))
        .unwrap_or(line)
        .trim();

    if line.is_empty() {
        None
    } else {
        Some(clip(line))
    }
}

fn first_non_blank_line(text: &str) -> Option<&str> {
    text.lines().find(|line| !line.trim().is_empty())
}

/// Truncate to the character limit, marking the cut with an ellipsis
fn clip(line: &str) -> String {
    if line.chars().count() > MAX_TITLE_CHARS {
        let head: String = line.chars().take(MAX_TITLE_CHARS).collect();
        format!("{head}{ELLIPSIS}")
    } else {
        line.to_string()
    }
}
