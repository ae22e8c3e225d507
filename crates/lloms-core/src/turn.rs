//! Streaming chat turn executor.
//!
//! Sends the bounded window to the chat model, forwards each received
//! fragment to the output surface in order, and stores the accumulated
//! response as one assistant message on completion. Transport failures and
//! cancellation abandon the turn without storing partial text; only store
//! failures propagate.

use crate::event::TurnEvent;
use futures_util::StreamExt;
use lloms_session::{ConversationLog, StorageError};
use lloms_types::{ChatBackend, ChatMessage, ChatRequest, ModelOptions};
use tokio_util::sync::CancellationToken;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The response completed and was saved to the store.
    Completed,
    /// The turn was abandoned (transport failure or cancellation); nothing
    /// was saved.
    Abandoned,
}

/// The chat turn configuration: primary model and its sampling options.
pub struct ChatTurn {
    model: String,
    options: ModelOptions,
}

impl ChatTurn {
    pub fn new(model: impl Into<String>, options: ModelOptions) -> Self {
        Self {
            model: model.into(),
            options,
        }
    }

    /// Execute one streaming chat turn over the given window.
    pub async fn execute<F>(
        &self,
        backend: &dyn ChatBackend,
        log: &mut ConversationLog,
        window: Vec<ChatMessage>,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> Result<TurnStatus, StorageError>
    where
        F: FnMut(TurnEvent),
    {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: window,
            stream: true,
            tools: None,
            format: None,
            options: Some(self.options.clone()),
        };

        let mut stream = match backend.chat_stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Chat request failed: {e}");
                on_event(TurnEvent::Warning(format!("Chat request failed: {e}")));
                return Ok(TurnStatus::Abandoned);
            }
        };

        let mut response = String::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Chat turn cancelled mid-stream");
                    on_event(TurnEvent::Warning("Response interrupted.".to_string()));
                    return Ok(TurnStatus::Abandoned);
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(chunk)) => {
                            if !chunk.message.content.is_empty() {
                                on_event(TurnEvent::TextDelta(chunk.message.content.clone()));
                                response.push_str(&chunk.message.content);
                            }
                            if chunk.done {
                                if let Some(count) = chunk.eval_count {
                                    tracing::debug!("Stream complete ({count} tokens)");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Chat stream failed: {e}");
                            on_event(TurnEvent::Warning(format!("Chat stream failed: {e}")));
                            return Ok(TurnStatus::Abandoned);
                        }
                        None => break,
                    }
                }
            }
        }

        log.save(ChatMessage::assistant(response))?;
        on_event(TurnEvent::Done);
        Ok(TurnStatus::Completed)
    }
}
