//! Bounded history window derivation.

use lloms_types::ChatMessage;

/// Derive the message window sent on a request: one synthetic system message
/// built from the current configured prompt, followed by the last `limit`
/// entries of `messages` in their original order.
///
/// A negative `limit` disables bounding and returns the entire history. The
/// prompt already stored in the log is ignored so a reconfigured prompt takes
/// effect immediately.
pub fn select_window(messages: &[ChatMessage], system_prompt: &str, limit: i64) -> Vec<ChatMessage> {
    let mut window = Vec::with_capacity(messages.len() + 1);
    window.push(ChatMessage::system(system_prompt));

    let start = if limit < 0 {
        0
    } else {
        messages.len().saturating_sub(limit as usize)
    };
    window.extend_from_slice(&messages[start..]);
    window
}
