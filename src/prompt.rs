//! Prompt construction for diagnostic turns
//!
//! Every request starts with the same two framing turns (the tutoring rules
//! and the persona acknowledgment), followed by the visible history and the
//! outgoing turn. Nothing here depends on anything but its arguments.

use crate::llm::{LlmMessage, LlmRequest};
use crate::session::{Message, Role};

/// Fixed output cap for every model call
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Token the model emits when the user has reached the answer
pub const SOLVED_MARKER: &str = "[SOLVED]";

/// Tutoring rules sent as the first framing turn
pub const SYSTEM_DIRECTIVE: &str = r#"
You are ELIS (Explain Like I'm Stuck), a specialized AI Diagnostic Tutor.
Your goal is to help users debug their understanding, NOT just their code.

RULES:
1. **NEVER give the final answer** immediately.
2. **Diagnose**: Identify the gap between the user's intent and their logic.
3. **Ask Socratic Questions**: Guide the user to the answer with pinpoint questions.
4. **Be Concise**: Keep responses short (1-2 sentences) unless asked for a "Deep Dive".
5. **Tone**: Constructive, encouraging, slightly "Cyber-Zen" but clear.

PHASES:
- **Phase 1 (Diagnosis)**: When the user submits a problem and a stuck point, analyze the code/logic. If there's an error, ask a question that highlights the specific line or concept causing it.
- **Phase 2 (Hint)**: If the user asks for a hint, give a stronger nudge but still no code solution.
- **Phase 3 (Deep Dive)**: If the user is totally lost or requests it, explain the underlying concept (e.g., "Memory allocation in C" or "React closure staleness") with an analogy.
- **Phase 4 (Success)**: If the user has clearly understood the concept and solved their problem, start your response with the token '[SOLVED]'.

FORMAT:
- Use bolding for key terms.
- Use code blocks for small examples if necessary to illustrate a concept, but never correct the user's entire code block.
"#;

/// Persona acknowledgment sent as the second framing turn
pub const PERSONA_ACK: &str = "Understood. I am ELIS, ready to act as a Diagnostic Tutor. I will not give answers, but guide the user with Socratic questioning.";

pub const HINT_REQUEST: &str =
    "Give me a small hint to nudge me in the right direction, based on our conversation.";

pub const METAPHOR_REQUEST: &str = "Explain the core concept or logic error in my problem using a creative, non-tech metaphor (like cooking, traffic, or architecture). Keep it brief and vivid.";

pub const GIVE_UP_REQUEST: &str = "I give up. Please explain the answer and the solution clearly.";

/// Visible user turn recorded when the user gives up
pub const GIVE_UP_MESSAGE: &str = "I give up.";

/// Substituted for the assistant reply when the model call fails
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting to my neural core. Please check your API key or try again.";

/// Build the request for one model call.
///
/// With an empty `history` this is the first turn of the diagnosis, so the
/// outgoing text wraps `request_text` together with the problem; otherwise
/// `request_text` is sent as is.
pub fn build_request(history: &[Message], problem_code: &str, request_text: &str) -> LlmRequest {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(LlmMessage::user(SYSTEM_DIRECTIVE));
    messages.push(LlmMessage::assistant(PERSONA_ACK));
    messages.extend(history.iter().map(|m| match m.role {
        Role::User => LlmMessage::user(m.content.clone()),
        Role::Assistant => LlmMessage::assistant(m.content.clone()),
    }));

    let outgoing = if history.is_empty() {
        first_turn_text(problem_code, request_text)
    } else {
        request_text.to_string()
    };
    messages.push(LlmMessage::user(outgoing));

    LlmRequest {
        messages,
        max_tokens: Some(MAX_OUTPUT_TOKENS),
    }
}

fn first_turn_text(problem_code: &str, stuck_point: &str) -> String {
    format!(
        "Here is my problem code/context:\n```\n{problem_code}\n```\n\nStuck Point: {stuck_point}\n\nDiagnose my logic gap."
    )
}

/// Remove every solved marker from a reply.
///
/// Returns the cleaned text and whether a marker was present. The whitespace
/// around each marker collapses to one separator: a newline if the marker sat
/// on its own line, a space otherwise. Text without the marker comes back
/// untouched.
pub fn strip_solved_marker(reply: &str) -> (String, bool) {
    if !reply.contains(SOLVED_MARKER) {
        return (reply.to_string(), false);
    }

    let mut out = String::with_capacity(reply.len());
    let mut line_break = false;
    for piece in reply.split(SOLVED_MARKER) {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            line_break |= piece.contains('\n');
            continue;
        }
        if !out.is_empty() {
            line_break |= breaks_line(piece.chars());
            out.push(if line_break { '\n' } else { ' ' });
        }
        out.push_str(trimmed);
        line_break = breaks_line(piece.chars().rev());
    }
    (out, true)
}

/// Whether the leading whitespace of `chars` contains a newline
fn breaks_line(chars: impl Iterator<Item = char>) -> bool {
    chars.take_while(|c| c.is_whitespace()).any(|c| c == '\n')
}
