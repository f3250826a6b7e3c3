use super::{AgentRun, TraceMessage};

/// Plain text of the run's final answer.
///
/// Prefers the last assistant-authored message. Without one, the envelope's
/// `output` string is used, then the last message of any role.
pub fn final_assistant_text(run: &AgentRun) -> String {
    if let Some(message) = run.messages.iter().rev().find(|m| m.is_assistant()) {
        return message.text();
    }
    if let Some(output) = run.output.as_deref().filter(|o| !o.is_empty()) {
        return output.to_string();
    }
    run.messages
        .last()
        .map(TraceMessage::text)
        .unwrap_or_default()
}
