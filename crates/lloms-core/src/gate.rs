//! Tool invocation gate.
//!
//! Before the chat turn, asks the tools-capable model whether a tool call is
//! warranted. At most one call is attempted per user turn; every failure on
//! this path is recoverable and leaves the window exactly as it was.

use crate::event::TurnEvent;
use lloms_session::{ConversationLog, StorageError};
use lloms_types::{ChatBackend, ChatMessage, ChatRequest, ModelOptions, ToolDefinition, ToolDispatcher};

/// The gate configuration: tools model, its sampling options, and the
/// immutable tool set discovered at startup.
pub struct ToolGate {
    model: String,
    options: ModelOptions,
    tools: Vec<ToolDefinition>,
}

impl ToolGate {
    /// Build a gate over a non-empty tool set.
    pub fn new(model: impl Into<String>, options: ModelOptions, tools: Vec<ToolDefinition>) -> Self {
        debug_assert!(!tools.is_empty());
        Self {
            model: model.into(),
            options,
            tools,
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn knows(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// Run the gate for one turn. On a successful tool call, two messages are
    /// appended to both the store (so they persist for future turns) and the
    /// in-memory `window` used for the immediately following chat turn.
    ///
    /// Only store failures propagate; everything else degrades to a warning.
    pub async fn augment<F>(
        &self,
        backend: &dyn ChatBackend,
        dispatcher: &dyn ToolDispatcher,
        log: &mut ConversationLog,
        window: &mut Vec<ChatMessage>,
        on_event: &mut F,
    ) -> Result<(), StorageError>
    where
        F: FnMut(TurnEvent),
    {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: window.clone(),
            stream: false,
            tools: Some(self.tools.clone()),
            format: Some("json".to_string()),
            options: Some(self.options.clone()),
        };

        let response = match backend.chat(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Tools check failed: {e}");
                on_event(TurnEvent::Warning(format!(
                    "Tools check failed: {e}. Continuing with standard chat."
                )));
                return Ok(());
            }
        };

        let Some(call) = response.message.tool_calls.first() else {
            return Ok(());
        };
        if response.message.tool_calls.len() > 1 {
            tracing::debug!(
                "Ignoring {} extra proposed tool calls",
                response.message.tool_calls.len() - 1
            );
        }

        let name = call.function.name.clone();
        if !self.knows(&name) {
            tracing::warn!("Model proposed unknown tool '{name}'");
            on_event(TurnEvent::Warning(format!(
                "Tool '{name}' does not exist. Continuing with standard chat."
            )));
            return Ok(());
        }

        on_event(TurnEvent::ToolCallStarted {
            name: name.clone(),
            arguments: call.function.arguments.clone(),
        });

        let text = match dispatcher
            .call_tool(&name, call.function.arguments.clone())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Tool call failed: {e}");
                on_event(TurnEvent::Warning(format!("Tool call failed: {e}")));
                return Ok(());
            }
        };

        on_event(TurnEvent::ToolCallCompleted {
            name: name.clone(),
            text: text.clone(),
        });

        let acknowledgment = ChatMessage::assistant(format!("I used {name} and got this result:"));
        let result = ChatMessage::user(text);

        log.save(acknowledgment.clone())?;
        log.save(result.clone())?;
        window.push(acknowledgment);
        window.push(result);

        Ok(())
    }
}
