//! Property-based tests for turn planning
//!
//! Runs arbitrary action sequences through `plan_turn` / `complete_turn`
//! exactly the way the engine sequences them, without I/O.

use super::turn::*;
use crate::llm::{LlmError, LlmResponse};
use crate::session::{Message, Session};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        "[a-z?][a-z ?]{0,19}".prop_map(|stuck_point| Action::Diagnose { stuck_point }),
        Just(Action::Hint),
        Just(Action::Metaphor),
        Just(Action::GiveUp),
        Just(Action::Resend),
    ]
}

/// Words joined by spaces or newlines, with markers scattered anywhere
fn arb_marked_text() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        proptest::collection::vec(("[a-zA-Z.,]{1,8}", any::<bool>(), any::<bool>()), 1..8),
    )
        .prop_map(|(lead, words)| {
            let mut text = String::new();
            if lead {
                text.push_str("[SOLVED] ");
            }
            for (word, marker, newline) in words {
                text.push_str(&word);
                if marker {
                    text.push_str(" [SOLVED]");
                }
                text.push(if newline { '\n' } else { ' ' });
            }
            text
        })
}

fn arb_reply() -> impl Strategy<Value = Result<LlmResponse, LlmError>> {
    prop_oneof![
        "[a-zA-Z .]{1,30}".prop_map(|t| Ok(LlmResponse::text(t))),
        arb_marked_text().prop_map(|t| Ok(LlmResponse::text(t))),
        Just(Err(LlmError::network("offline"))),
    ]
}

fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    proptest::collection::vec(
        ("[a-z]{1,10}", any::<bool>()).prop_map(|(text, user)| {
            if user {
                Message::user(text)
            } else {
                Message::assistant(text)
            }
        }),
        0..8,
    )
}

fn session_with(history: Vec<Message>) -> Session {
    let mut session = Session::new();
    session.problem_code = "let x = 1;".to_string();
    session.messages = history;
    session
}

/// One turn, the way the engine applies it
fn run_turn(
    session: &mut Session,
    action: Action,
    result: Result<LlmResponse, LlmError>,
) -> Result<TurnCompletion, TurnError> {
    let plan = plan_turn(session, action)?;
    if let Some(pre) = plan.pre_call.clone() {
        session.apply(pre);
    }
    let done = complete_turn(plan, result);
    session.apply(done.patch.clone());
    Ok(done)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_history_grows_per_action(
        history in arb_history(),
        steps in proptest::collection::vec((arb_action(), arb_reply()), 1..12),
    ) {
        let mut session = session_with(history);

        for (action, reply) in steps {
            let before = session.messages.clone();
            let last_user = session.last_user_index();
            let expected_len = match &action {
                Action::Diagnose { .. } | Action::GiveUp => Some(before.len() + 2),
                Action::Hint | Action::Metaphor => Some(before.len() + 1),
                Action::Resend => last_user.map(|i| i + 2),
            };

            match run_turn(&mut session, action.clone(), reply) {
                Ok(_) => {
                    let expected_len = expected_len.unwrap();
                    prop_assert_eq!(session.messages.len(), expected_len);
                    // The new tail is always exactly one assistant message
                    prop_assert!(!session.messages.last().unwrap().is_user());
                    // Everything before the replaced tail is untouched
                    let kept = match action {
                        Action::Resend => last_user.unwrap() + 1,
                        _ => before.len(),
                    };
                    prop_assert_eq!(&session.messages[..kept], &before[..kept]);
                }
                Err(TurnError::NothingToResend) => {
                    prop_assert!(last_user.is_none());
                    prop_assert_eq!(&session.messages, &before);
                }
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
            }
        }
    }

    #[test]
    fn prop_solved_never_resets(
        steps in proptest::collection::vec((arb_action(), arb_reply()), 1..16),
    ) {
        let mut session = session_with(vec![]);
        let mut was_solved = false;

        for (action, reply) in steps {
            let give_up = action == Action::GiveUp;
            if run_turn(&mut session, action, reply).is_ok() && give_up {
                prop_assert!(session.is_solved);
            }
            if was_solved {
                prop_assert!(session.is_solved);
            }
            was_solved = session.is_solved;
        }
    }

    #[test]
    fn prop_resend_is_idempotent_on_context(
        history in arb_history(),
        first in arb_reply(),
        second in arb_reply(),
    ) {
        let mut session = session_with(history);
        prop_assume!(session.last_user_index().is_some());

        let request_before = plan_turn(&session, Action::Resend).unwrap().request;
        run_turn(&mut session, Action::Resend, first).unwrap();
        let prefix = session.messages[..session.messages.len() - 1].to_vec();

        let request_again = plan_turn(&session, Action::Resend).unwrap().request;
        prop_assert_eq!(&request_before, &request_again);

        run_turn(&mut session, Action::Resend, second).unwrap();
        prop_assert_eq!(&session.messages[..session.messages.len() - 1], &prefix[..]);
    }

    #[test]
    fn prop_marker_never_stored(
        history in arb_history(),
        action in arb_action(),
        reply in arb_reply(),
    ) {
        let marked = reply.as_ref().is_ok_and(|r| r.text.contains("[SOLVED]"));
        let mut session = session_with(history);
        if let Ok(done) = run_turn(&mut session, action, reply) {
            let stored = &session.messages.last().unwrap().content;
            prop_assert!(!stored.contains("[SOLVED]"));
            if marked {
                // Each removed marker leaves a single separator behind
                prop_assert!(!stored.contains("  "));
                prop_assert_eq!(stored.trim(), stored.as_str());
                prop_assert!(done.marked_solved);
                prop_assert!(session.is_solved);
            }
        }
    }
}
