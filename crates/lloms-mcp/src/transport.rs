//! Stdio transport for MCP server communication.
//!
//! Spawns the server as a child process and exchanges newline-delimited
//! JSON-RPC messages over its stdin/stdout. Requests are strictly sequential:
//! the session issues one call at a time, so the transport writes a request
//! and reads lines until the matching response arrives.

use crate::error::McpError;
use crate::jsonrpc::{Notification, Request, Response};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Sequential stdio transport to a spawned MCP server.
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    timeout_ms: u64,
}

impl StdioTransport {
    /// Spawn the server process with piped stdio.
    pub fn spawn(command: &str, args: &[String], timeout_ms: u64) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::SpawnFailed {
                command: command.to_string(),
                source,
            })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        Ok(Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
            timeout_ms,
        })
    }

    /// Send a request and wait for the response carrying its id. Server
    /// notifications and unparseable lines are skipped with a warning.
    pub async fn send_request(
        &mut self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<Response, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request::new(id, method, params);
        self.write_line(&serde_json::to_string(&request)?).await?;

        let timeout = Duration::from_millis(self.timeout_ms);
        match tokio::time::timeout(timeout, self.read_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout {
                method: method.to_string(),
                timeout_ms: self.timeout_ms,
            }),
        }
    }

    /// Send a notification (fire-and-forget).
    pub async fn send_notification(
        &mut self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let notification = Notification::new(method, params);
        self.write_line(&serde_json::to_string(&notification)?).await
    }

    /// Close stdin, give the server a moment to exit, then kill it.
    pub async fn shutdown(mut self) {
        let _ = self.stdin.shutdown().await;
        drop(self.stdin);

        let graceful =
            tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
        if graceful.is_err() {
            let _ = self.child.kill().await;
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), McpError> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, id: u64) -> Result<Response, McpError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await?
                .ok_or(McpError::ServerClosed)?;
            if line.trim().is_empty() {
                continue;
            }

            let response: Response = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping unparseable MCP line: {e}: {line}");
                    continue;
                }
            };

            match response.id {
                Some(got) if got == id => return Ok(response),
                Some(got) => {
                    tracing::warn!("Dropping MCP response for stale id {got} (awaiting {id})");
                }
                // Server-initiated notification; nothing to do with it.
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_simple_process() {
        let transport = StdioTransport::spawn("cat", &[], 5000);
        assert!(transport.is_ok());
        transport.unwrap().shutdown().await;
    }

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        let result = StdioTransport::spawn("this_command_does_not_exist_xyz123", &[], 5000);
        match result {
            Err(McpError::SpawnFailed { command, .. }) => {
                assert_eq!(command, "this_command_does_not_exist_xyz123");
            }
            Err(other) => panic!("Expected SpawnFailed, got: {other:?}"),
            Ok(_) => panic!("Expected error, got Ok"),
        }
    }

    #[tokio::test]
    async fn request_response_roundtrip_with_mock_server() {
        // A bash loop that answers every request with a result echoing its id.
        let script = r#"while IFS= read -r line; do id=$(echo "$line" | python3 -c "import sys,json; print(json.loads(sys.stdin.read())['id'])"); echo "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"ok\":true}}"; done"#;
        let transport =
            StdioTransport::spawn("bash", &["-c".to_string(), script.to_string()], 5000);

        let Ok(mut transport) = transport else {
            // bash/python3 unavailable; nothing to test here
            return;
        };

        let resp = transport
            .send_request("tools/list", Some(serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["ok"], true);

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn server_notifications_are_skipped() {
        // Emits a notification line before the real response.
        let script = r#"while IFS= read -r line; do id=$(echo "$line" | python3 -c "import sys,json; print(json.loads(sys.stdin.read())['id'])"); echo "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}"; echo "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"ok\":1}}"; done"#;
        let transport =
            StdioTransport::spawn("bash", &["-c".to_string(), script.to_string()], 5000);

        let Ok(mut transport) = transport else {
            return;
        };

        let resp = transport.send_request("initialize", None).await.unwrap();
        assert_eq!(resp.result.unwrap()["ok"], 1);

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn notification_does_not_wait_for_reply() {
        let mut transport = StdioTransport::spawn("cat", &[], 5000).unwrap();
        let result = transport
            .send_notification("notifications/initialized", None)
            .await;
        assert!(result.is_ok());
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn timeout_fires_on_unresponsive_server() {
        // `sleep` never writes to stdout, so the request times out.
        let mut transport =
            StdioTransport::spawn("sleep", &["10".to_string()], 100).unwrap();

        let result = transport
            .send_request("tools/list", Some(serde_json::json!({})))
            .await;
        match result.unwrap_err() {
            McpError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, 100),
            other => panic!("Expected Timeout, got: {other:?}"),
        }

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn closed_server_reports_server_closed() {
        // `true` exits immediately; reading a response hits EOF.
        let mut transport = StdioTransport::spawn("true", &[], 5000).unwrap();
        let result = transport.send_request("tools/list", None).await;
        assert!(matches!(result, Err(McpError::ServerClosed) | Err(McpError::Io(_))));
        transport.shutdown().await;
    }
}
