//! MCP (Model Context Protocol) client for LLoms.
//!
//! Speaks newline-delimited JSON-RPC 2.0 to a tool server spawned as a child
//! process. The server is started once at session init, its tools are
//! discovered once, and the process is held for the session lifetime. One
//! request is in flight at a time; the session never issues concurrent calls.

pub mod client;
pub mod config;
pub mod error;
pub mod jsonrpc;
mod transport;

pub use client::{McpClient, McpToolInfo};
pub use config::McpServerConfig;
pub use error::McpError;
