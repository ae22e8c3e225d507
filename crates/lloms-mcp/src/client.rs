//! MCP client — one server connection for the session.
//!
//! Handles the protocol handshake (initialize + initialized notification),
//! one-time tool discovery (tools/list), and tool invocation (tools/call).

use crate::config::McpServerConfig;
use crate::error::McpError;
use crate::transport::StdioTransport;
use lloms_types::{ToolDefinition, ToolDispatcher, ToolError};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;

/// MCP protocol version we speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// A tool exposed by the connected server.
#[derive(Debug, Clone)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl McpToolInfo {
    /// Convert to the definition shape sent to the tools-capable model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        )
    }
}

/// Client for a single MCP server, held for the process lifetime.
///
/// The transport is sequential; the mutex serializes callers so invocation
/// can run behind a shared reference.
pub struct McpClient {
    name: String,
    transport: Mutex<StdioTransport>,
    tools: Vec<McpToolInfo>,
}

#[derive(Deserialize)]
struct ToolsListResult {
    tools: Vec<ToolEntry>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[derive(Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ToolContent>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ToolContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl McpClient {
    /// Spawn the configured server, run the handshake, and discover tools.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        let mut transport =
            StdioTransport::spawn(&config.command, &config.args, config.timeout_ms)?;

        let init_params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "lloms",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let resp = transport.send_request("initialize", Some(init_params)).await?;
        if let Some(err) = resp.error {
            return Err(McpError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }

        transport
            .send_notification("notifications/initialized", None)
            .await?;

        let tools_resp = transport.send_request("tools/list", None).await?;
        let tools = match (tools_resp.result, tools_resp.error) {
            (Some(result), _) => {
                let list: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                    McpError::Protocol(format!("Failed to parse tools/list response: {e}"))
                })?;
                list.tools
                    .into_iter()
                    .map(|t| McpToolInfo {
                        name: t.name,
                        description: t.description.unwrap_or_default(),
                        input_schema: t.input_schema,
                    })
                    .collect()
            }
            (None, Some(err)) => {
                return Err(McpError::JsonRpc {
                    code: err.code,
                    message: err.message,
                });
            }
            (None, None) => Vec::new(),
        };

        tracing::info!(
            "MCP server '{}' connected with {} tools",
            config.name,
            tools.len()
        );

        Ok(Self {
            name: config.name.clone(),
            transport: Mutex::new(transport),
            tools,
        })
    }

    /// Invoke a tool and return the concatenated text of its result.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let resp = {
            let mut transport = self.transport.lock().await;
            transport.send_request("tools/call", Some(params)).await?
        };

        if let Some(err) = resp.error {
            return Err(McpError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = resp.result.ok_or_else(|| {
            McpError::Protocol("tools/call response has neither result nor error".to_string())
        })?;

        let call_result: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Failed to parse tools/call result: {e}")))?;

        let text = call_result
            .content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                ToolContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if call_result.is_error {
            return Err(McpError::Protocol(if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            }));
        }

        Ok(text)
    }

    /// The tools discovered at connect time.
    pub fn tools(&self) -> &[McpToolInfo] {
        &self.tools
    }

    /// Tool definitions in the shape the tools model expects.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(McpToolInfo::to_definition).collect()
    }

    pub fn server_name(&self) -> &str {
        &self.name
    }

    /// Shut down the server connection.
    pub async fn shutdown(self) {
        self.transport.into_inner().shutdown().await;
    }
}

impl ToolDispatcher for McpClient {
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            self.invoke(name, arguments)
                .await
                .map_err(|e| ToolError::InvocationFailed {
                    name: name.to_string(),
                    message: e.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_entry_parses_with_schema() {
        let json = r#"{
            "name": "read_file",
            "description": "Read a file",
            "inputSchema": {
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }
        }"#;
        let entry: ToolEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.name, "read_file");
        assert_eq!(entry.description.as_deref(), Some("Read a file"));
        assert_eq!(entry.input_schema["type"], "object");
    }

    #[test]
    fn tool_entry_defaults_missing_fields() {
        let entry: ToolEntry = serde_json::from_str(r#"{"name": "list"}"#).unwrap();
        assert!(entry.description.is_none());
        assert_eq!(entry.input_schema["type"], "object");
    }

    #[test]
    fn tools_list_result_parses() {
        let json = r#"{
            "tools": [
                {"name": "a", "description": "Tool A", "inputSchema": {"type": "object"}},
                {"name": "b", "inputSchema": {"type": "object"}}
            ]
        }"#;
        let result: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.tools.len(), 2);
        assert_eq!(result.tools[0].name, "a");
    }

    #[test]
    fn tool_call_result_concatenates_text_items() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"}
            ],
            "isError": false
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 2);
    }

    #[test]
    fn tool_call_result_marks_error() {
        let json = r#"{"content": [{"type": "text", "text": "not found"}], "isError": true}"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(result.is_error);
    }

    #[test]
    fn non_text_content_is_ignored() {
        let json = r#"{
            "content": [
                {"type": "image", "data": "base64", "mimeType": "image/png"},
                {"type": "text", "text": "caption"}
            ]
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        let texts: Vec<_> = result
            .content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.clone()),
                ToolContent::Other => None,
            })
            .collect();
        assert_eq!(texts, vec!["caption"]);
    }

    #[test]
    fn tool_info_converts_to_function_definition() {
        let info = McpToolInfo {
            name: "add".into(),
            description: "Add numbers".into(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let def = info.to_definition();
        assert_eq!(def.name(), "add");
        assert_eq!(def.tool_type, "function");
    }
}
