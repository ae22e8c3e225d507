//! Ollama chat API client with NDJSON streaming for LLoms.

mod client;
mod ndjson;
mod stream;

pub use client::OllamaClient;
pub use stream::ChatStream;
