//! Pure turn planning
//!
//! A turn is split around the model call. [`plan_turn`] validates the action
//! against the session and decides what is persisted before the call and what
//! is sent; [`complete_turn`] folds the call's result into the patch that
//! finishes the turn. Neither function performs I/O.

use crate::llm::{LlmError, LlmErrorKind, LlmRequest, LlmResponse};
use crate::prompt::{
    build_request, strip_solved_marker, FALLBACK_REPLY, GIVE_UP_MESSAGE, GIVE_UP_REQUEST,
    HINT_REQUEST, METAPHOR_REQUEST,
};
use crate::session::{Message, Session, SessionPatch};
use thiserror::Error;

/// A user-triggered transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Diagnose { stuck_point: String },
    Hint,
    Metaphor,
    GiveUp,
    Resend,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Diagnose { .. } => "diagnose",
            Action::Hint => "hint",
            Action::Metaphor => "metaphor",
            Action::GiveUp => "give_up",
            Action::Resend => "resend",
        }
    }
}

/// Reasons a turn is refused before anything is sent or stored
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Please enter a problem or code snippet first.")]
    EmptyProblem,
    #[error("Describe where you are stuck first.")]
    EmptyStuckPoint,
    #[error("There is no message to resend.")]
    NothingToResend,
    #[error("This session is already being analyzed.")]
    Busy,
}

/// How the reply moves the solved flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolvedRule {
    /// Set when the reply carries the marker
    FromMarker,
    /// Always set
    Force,
}

/// Everything needed to run one turn
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub action: &'static str,
    pub request: LlmRequest,
    /// Persisted before the call, if the turn changes visible state up front
    pub pre_call: Option<SessionPatch>,
    /// History the reply gets appended to
    base_messages: Vec<Message>,
    solved_rule: SolvedRule,
}

/// Result of folding a model reply into a plan
#[derive(Debug, Clone)]
pub struct TurnCompletion {
    pub patch: SessionPatch,
    pub reply: Message,
    pub marked_solved: bool,
    pub failure: Option<LlmErrorKind>,
}

pub fn plan_turn(session: &Session, action: Action) -> Result<TurnPlan, TurnError> {
    let name = action.name();
    let code = session.problem_code.as_str();

    let (request, base_messages, pre_call, solved_rule) = match action {
        Action::Diagnose { stuck_point } => {
            if code.trim().is_empty() {
                return Err(TurnError::EmptyProblem);
            }
            if stuck_point.trim().is_empty() {
                return Err(TurnError::EmptyStuckPoint);
            }
            let request = build_request(&session.messages, code, &stuck_point);
            let mut base = session.messages.clone();
            base.push(Message::user(stuck_point.clone()));
            let pre_call = SessionPatch::stuck_point(stuck_point).messages(base.clone());
            (request, base, Some(pre_call), SolvedRule::FromMarker)
        }
        Action::Hint => (
            build_request(&session.messages, code, HINT_REQUEST),
            session.messages.clone(),
            None,
            SolvedRule::FromMarker,
        ),
        Action::Metaphor => (
            build_request(&session.messages, code, METAPHOR_REQUEST),
            session.messages.clone(),
            None,
            SolvedRule::FromMarker,
        ),
        Action::GiveUp => {
            let mut base = session.messages.clone();
            base.push(Message::user(GIVE_UP_MESSAGE));
            let request = build_request(&base, code, GIVE_UP_REQUEST);
            let pre_call = SessionPatch::default().messages(base.clone());
            (request, base, Some(pre_call), SolvedRule::Force)
        }
        Action::Resend => {
            let last_user = session
                .last_user_index()
                .ok_or(TurnError::NothingToResend)?;
            let context = &session.messages[..last_user];
            let text = &session.messages[last_user].content;
            let request = build_request(context, code, text);
            let base = session.messages[..=last_user].to_vec();
            let pre_call = SessionPatch::default().messages(base.clone());
            (request, base, Some(pre_call), SolvedRule::FromMarker)
        }
    };

    Ok(TurnPlan {
        action: name,
        request,
        pre_call,
        base_messages,
        solved_rule,
    })
}

/// Fold the model result into the finishing patch.
///
/// A failed call still produces a reply: the fixed fallback text.
pub fn complete_turn(plan: TurnPlan, result: Result<LlmResponse, LlmError>) -> TurnCompletion {
    let (text, marker, failure) = match result {
        Ok(response) => {
            let (text, marker) = strip_solved_marker(&response.text);
            (text, marker, None)
        }
        Err(e) => (FALLBACK_REPLY.to_string(), false, Some(e.kind)),
    };

    let marked_solved = match plan.solved_rule {
        SolvedRule::FromMarker => marker,
        SolvedRule::Force => true,
    };

    let reply = Message::assistant(text);
    let mut messages = plan.base_messages;
    messages.push(reply.clone());

    let mut patch = SessionPatch::default().messages(messages);
    if marked_solved {
        patch = patch.mark_solved();
    }

    TurnCompletion {
        patch,
        reply,
        marked_solved,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SYSTEM_DIRECTIVE;
    use crate::session::Role;

    fn session_with(messages: Vec<Message>) -> Session {
        let mut session = Session::new();
        session.problem_code = "for i in range(10): print(i+1)".to_string();
        session.messages = messages;
        session
    }

    fn apply(session: &mut Session, plan: TurnPlan, result: Result<LlmResponse, LlmError>) {
        if let Some(pre) = plan.pre_call.clone() {
            session.apply(pre);
        }
        let done = complete_turn(plan, result);
        session.apply(done.patch);
    }

    #[test]
    fn test_diagnose_requires_problem_and_stuck_point() {
        let mut session = session_with(vec![]);
        let stuck = Action::Diagnose {
            stuck_point: "why?".to_string(),
        };
        let blank = Action::Diagnose {
            stuck_point: "  \n".to_string(),
        };

        assert_eq!(plan_turn(&session, blank).unwrap_err(), TurnError::EmptyStuckPoint);

        session.problem_code = "   ".to_string();
        assert_eq!(plan_turn(&session, stuck).unwrap_err(), TurnError::EmptyProblem);
    }

    #[test]
    fn test_diagnose_first_turn() {
        let mut session = session_with(vec![]);
        let plan = plan_turn(
            &session,
            Action::Diagnose {
                stuck_point: "why off by one?".to_string(),
            },
        )
        .unwrap();

        assert_eq!(plan.request.messages[0].text, SYSTEM_DIRECTIVE);
        assert!(plan.request.outgoing_text().unwrap().contains("Stuck Point: why off by one?"));

        apply(&mut session, plan, Ok(LlmResponse::text("What does range(10) yield first?")));
        assert_eq!(
            session.messages,
            vec![
                Message::user("why off by one?"),
                Message::assistant("What does range(10) yield first?"),
            ]
        );
        assert_eq!(session.stuck_point, "why off by one?");
        assert_eq!(session.title, "why off by one?");
        assert!(!session.is_solved);
    }

    #[test]
    fn test_diagnose_does_not_reset_solved() {
        let mut session = session_with(vec![Message::user("a"), Message::assistant("b")]);
        session.is_solved = true;
        let plan = plan_turn(
            &session,
            Action::Diagnose {
                stuck_point: "follow-up".to_string(),
            },
        )
        .unwrap();
        apply(&mut session, plan, Ok(LlmResponse::text("sure")));
        assert!(session.is_solved);
        assert_eq!(session.messages.len(), 4);
    }

    #[test]
    fn test_marker_sets_solved_and_is_stripped() {
        let mut session = session_with(vec![]);
        let plan = plan_turn(
            &session,
            Action::Diagnose {
                stuck_point: "oh, range starts at 0?".to_string(),
            },
        )
        .unwrap();
        apply(&mut session, plan, Ok(LlmResponse::text("[SOLVED] You got it.")));

        assert_eq!(session.messages[1].content, "You got it.");
        assert!(session.is_solved);
    }

    #[test]
    fn test_hint_appends_one_reply() {
        let mut session = session_with(vec![Message::user("A"), Message::assistant("B")]);
        let plan = plan_turn(&session, Action::Hint).unwrap();
        assert!(plan.pre_call.is_none());
        assert_eq!(plan.request.outgoing_text(), Some(HINT_REQUEST));

        apply(&mut session, plan, Ok(LlmResponse::text("look at the +1")));
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[..2], [Message::user("A"), Message::assistant("B")]);
        assert_eq!(session.messages[2].content, "look at the +1");
        assert!(!session.is_solved);
    }

    #[test]
    fn test_marker_in_hint_or_metaphor_reply_sets_solved() {
        for action in [Action::Hint, Action::Metaphor] {
            let mut session = session_with(vec![Message::user("A"), Message::assistant("B")]);
            let plan = plan_turn(&session, action).unwrap();
            apply(&mut session, plan, Ok(LlmResponse::text("[SOLVED] You got it.")));

            assert_eq!(session.messages[2].content, "You got it.");
            assert!(session.is_solved);
        }
    }

    #[test]
    fn test_metaphor_on_empty_history_uses_composite() {
        let session = session_with(vec![]);
        let plan = plan_turn(&session, Action::Metaphor).unwrap();
        let outgoing = plan.request.outgoing_text().unwrap();
        assert!(outgoing.starts_with("Here is my problem code/context:"));
        assert!(outgoing.contains(METAPHOR_REQUEST));
    }

    #[test]
    fn test_give_up_forces_solved() {
        let mut session = session_with(vec![Message::user("A"), Message::assistant("B")]);
        let plan = plan_turn(&session, Action::GiveUp).unwrap();

        let sent: Vec<_> = plan.request.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(sent[sent.len() - 2], GIVE_UP_MESSAGE);
        assert_eq!(sent[sent.len() - 1], GIVE_UP_REQUEST);

        apply(&mut session, plan, Ok(LlmResponse::text("Here is the answer.")));
        assert!(session.is_solved);
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[2], Message::user(GIVE_UP_MESSAGE));
    }

    #[test]
    fn test_resend_truncates_and_replaces_reply() {
        let mut session = session_with(vec![
            Message::user("A"),
            Message::assistant("B"),
            Message::user("C"),
            Message::assistant("D"),
        ]);
        let plan = plan_turn(&session, Action::Resend).unwrap();

        // Context excludes the resent message, which is the outgoing turn
        assert_eq!(plan.request.messages.len(), 2 + 2 + 1);
        assert_eq!(plan.request.outgoing_text(), Some("C"));

        let mut truncated = session.clone();
        truncated.apply(plan.pre_call.clone().unwrap());
        assert_eq!(
            truncated.messages,
            vec![Message::user("A"), Message::assistant("B"), Message::user("C")]
        );

        apply(&mut session, plan, Ok(LlmResponse::text("D'")));
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[3], Message::assistant("D'"));
    }

    #[test]
    fn test_resend_without_user_message_is_rejected() {
        let session = session_with(vec![]);
        assert_eq!(
            plan_turn(&session, Action::Resend).unwrap_err(),
            TurnError::NothingToResend
        );
    }

    #[test]
    fn test_failure_substitutes_fallback() {
        let mut session = session_with(vec![]);
        let plan = plan_turn(
            &session,
            Action::Diagnose {
                stuck_point: "why?".to_string(),
            },
        )
        .unwrap();
        let done = complete_turn(plan.clone(), Err(LlmError::new(LlmErrorKind::RateLimit, "quota")));
        assert_eq!(done.failure, Some(LlmErrorKind::RateLimit));
        assert_eq!(done.reply.content, FALLBACK_REPLY);
        assert!(!done.marked_solved);

        apply(&mut session, plan, Err(LlmError::network("down")));
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert!(!session.is_solved);
    }
}
