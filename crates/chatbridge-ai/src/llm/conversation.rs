//! Conversation assembly rules

use crate::llm::client::{Message, Role};

/// Build the outgoing message list for one chat turn.
///
/// The system prompt is prepended only when the caller-supplied history does
/// not already lead with its own system message; a caller system message
/// always stands as-is. The new user message goes last. `new_message` is not
/// validated here; the endpoint layer rejects empty input before this runs.
pub fn build_conversation(
    system_prompt: &str,
    history: &[Message],
    new_message: &str,
) -> Vec<Message> {
    let mut conversation = Vec::with_capacity(history.len() + 2);

    if history.first().map(|m| m.role) != Some(Role::System) {
        conversation.push(Message::system(system_prompt));
    }

    conversation.extend(history.iter().cloned());
    conversation.push(Message::user(new_message));

    conversation
}
