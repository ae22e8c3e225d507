//! Shared chat types and error hierarchy for LLoms.

pub mod backend;
pub mod error;
pub mod message;

pub use backend::{ChatBackend, ChunkStream, ToolDispatcher};
pub use error::{ApiError, ConfigError, ToolError};
pub use message::*;
