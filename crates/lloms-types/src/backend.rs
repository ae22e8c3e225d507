//! Collaborator traits consumed by the orchestration core.

use crate::{ApiError, ChatRequest, ChatResponse, ToolError};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;

/// A boxed async stream of response chunks from a streaming chat request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatResponse, ApiError>> + Send>>;

/// The chat backend seam: one non-streaming and one streaming completion call.
///
/// Dyn-compatible so the session works with `Arc<dyn ChatBackend>` and tests
/// can substitute a scripted backend.
pub trait ChatBackend: Send + Sync {
    /// Send a non-streaming chat request and return the complete response.
    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, ApiError>> + Send + 'a>>;

    /// Send a streaming chat request and return an ordered stream of chunks.
    fn chat_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkStream, ApiError>> + Send + 'a>>;

    /// Backend name for logging/display (e.g. "ollama").
    fn name(&self) -> &str;
}

/// The tool transport seam: invoke one named tool and return its textual
/// result.
pub trait ToolDispatcher: Send + Sync {
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;
}
