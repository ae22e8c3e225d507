//! The per-session context object.
//!
//! Owns the conversation log, the backend handle, and the optional tool
//! support, and drives the gate → chat-turn pipeline for each user input.

use crate::event::TurnEvent;
use crate::gate::ToolGate;
use crate::turn::{ChatTurn, TurnStatus};
use lloms_session::{ConversationLog, StorageError, select_window};
use lloms_types::{ChatBackend, ChatMessage, ModelOptions, Role, ToolDefinition, ToolDispatcher};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the session needs from configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub chat_model: String,
    pub tools_model: String,
    pub system_prompt: String,
    pub history_window: i64,
    pub chat_options: ModelOptions,
    pub tools_options: ModelOptions,
}

struct ToolSupport {
    dispatcher: Arc<dyn ToolDispatcher>,
    gate: ToolGate,
}

/// One interactive chat session: log, backend, optional tools.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    tools: Option<ToolSupport>,
    turn: ChatTurn,
    log: ConversationLog,
    system_prompt: String,
    history_window: i64,
    tools_model: String,
    tools_options: ModelOptions,
}

impl ChatSession {
    /// Create a session and seed the log with the configured system prompt.
    pub fn new(config: SessionConfig, backend: Arc<dyn ChatBackend>) -> Result<Self, StorageError> {
        let mut log = ConversationLog::new();
        log.save(ChatMessage::system(config.system_prompt.clone()))?;

        Ok(Self {
            backend,
            tools: None,
            turn: ChatTurn::new(config.chat_model, config.chat_options),
            log,
            system_prompt: config.system_prompt,
            history_window: config.history_window,
            tools_model: config.tools_model,
            tools_options: config.tools_options,
        })
    }

    /// Enable the tool gate with the discovered tool set. An empty set is
    /// ignored: the gate requires at least one tool.
    pub fn enable_tools(&mut self, dispatcher: Arc<dyn ToolDispatcher>, tools: Vec<ToolDefinition>) {
        if tools.is_empty() {
            tracing::debug!("No tools discovered; gate stays disabled");
            return;
        }
        let gate = ToolGate::new(self.tools_model.clone(), self.tools_options.clone(), tools);
        self.tools = Some(ToolSupport { dispatcher, gate });
    }

    pub fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Number of messages stored so far (including the seeded system prompt).
    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    /// The full stored history in insertion order.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.log.all()
    }

    /// Process one user turn: save the input, derive the bounded window, run
    /// the tool gate if tools are available, then execute the streaming chat
    /// turn. Transport failures are reported through `on_event` and abandon
    /// the turn; only store failures propagate.
    pub async fn process_turn<F>(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<TurnStatus, StorageError>
    where
        F: FnMut(TurnEvent),
    {
        self.log.save(ChatMessage::user(input))?;

        // The window always carries a fresh copy of the configured prompt, so
        // the seeded system message is excluded from the bounded tail.
        let history: Vec<ChatMessage> = self
            .log
            .all()
            .into_iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let mut window = select_window(&history, &self.system_prompt, self.history_window);

        if let Some(tools) = &self.tools {
            tools
                .gate
                .augment(
                    self.backend.as_ref(),
                    tools.dispatcher.as_ref(),
                    &mut self.log,
                    &mut window,
                    &mut on_event,
                )
                .await?;
        }

        self.turn
            .execute(
                self.backend.as_ref(),
                &mut self.log,
                window,
                cancel,
                &mut on_event,
            )
            .await
    }
}
