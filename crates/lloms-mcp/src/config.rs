//! Launch descriptor for an MCP tool server.

use serde::{Deserialize, Serialize};

fn default_timeout() -> u64 {
    30_000
}

/// How to start one MCP server: a name for display, the command to spawn,
/// and its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}
