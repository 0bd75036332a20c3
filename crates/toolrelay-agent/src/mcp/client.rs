//! MCP client over stdio.
//!
//! JSON-RPC 2.0, one message per line. A writer task owns the child's stdin,
//! a reader task matches responses to pending requests by id, and a third
//! task forwards the child's stderr to `debug` logs.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, info, warn};

use super::config::StdioLaunch;
use crate::error::McpError;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `tools/list` pages, in case a provider keeps returning cursors.
const MAX_LIST_PAGES: usize = 100;

/// Requests awaiting a response, keyed by JSON-RPC id. `closed` is set once
/// the provider's stdout ends; nothing may be registered after that.
#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<String, oneshot::Sender<Value>>,
}

type PendingMap = Arc<RwLock<Pending>>;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// A tool as advertised by `tools/list`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListToolsPage {
    tools: Vec<McpToolInfo>,
    next_cursor: Option<String>,
}

/// Result of `tools/call`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CallToolResult {
    pub content: Vec<Value>,
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

// ─────────────────────────────────────────────
// Session trait
// ─────────────────────────────────────────────

/// The operations imported tools need from a connected provider.
#[async_trait]
pub trait McpSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError>;
}

// ─────────────────────────────────────────────
// Stdio client
// ─────────────────────────────────────────────

/// A connected provider process.
pub struct McpClient {
    name: String,
    tx: mpsc::Sender<String>,
    pending: PendingMap,
    next_id: AtomicU64,
    timeout: Duration,
    // Held so the child is killed when the client is dropped.
    child: std::sync::Mutex<Child>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl McpClient {
    /// Spawn the provider and perform the `initialize` handshake.
    pub async fn connect(
        name: &str,
        launch: &StdioLaunch,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut command = Command::new(&launch.command);
        command
            .args(&launch.args)
            .envs(&launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &launch.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| McpError::Spawn {
            command: launch.command.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Protocol("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Protocol("child stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McpError::Protocol("child stderr unavailable".into()))?;

        let (tx, rx) = mpsc::channel::<String>(64);
        let pending: PendingMap = Arc::new(RwLock::new(Pending::default()));

        tokio::spawn(write_loop(name.to_string(), stdin, rx));
        tokio::spawn(read_loop(name.to_string(), stdout, Arc::clone(&pending)));
        tokio::spawn(stderr_loop(name.to_string(), stderr));

        let client = Self {
            name: name.to_string(),
            tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout,
            child: std::sync::Mutex::new(child),
        };

        let init = client
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "toolrelay",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;
        client.notify("notifications/initialized", json!({})).await?;

        info!(
            provider = %name,
            server = init["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            "MCP provider connected"
        );
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kill the child process now instead of waiting for drop.
    pub fn shutdown(&self) {
        if let Ok(mut child) = self.child.lock() {
            if let Err(e) = child.start_kill() {
                debug!(provider = %self.name, error = %e, "kill failed");
            }
        }
    }

    /// Send a request and wait for the matching response's `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let raw_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = raw_id.to_string();
        let message = json!({
            "jsonrpc": "2.0",
            "id": raw_id,
            "method": method,
            "params": params,
        });

        let (resp_tx, resp_rx) = oneshot::channel();
        {
            let mut pending = self.pending.write().await;
            if pending.closed {
                return Err(McpError::Disconnected);
            }
            pending.waiters.insert(id.clone(), resp_tx);
        }

        if self.tx.send(message.to_string()).await.is_err() {
            self.pending.write().await.waiters.remove(&id);
            return Err(McpError::Disconnected);
        }

        match tokio::time::timeout(self.timeout, resp_rx).await {
            Ok(Ok(response)) => into_result(response),
            Ok(Err(_)) => Err(McpError::Disconnected),
            Err(_) => {
                self.pending.write().await.waiters.remove(&id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    /// Send a notification (no id, no response).
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| McpError::Disconnected)
    }
}

#[async_trait]
impl McpSession for McpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ListToolsPage = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("tools/list: {e}")))?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(provider = %self.name, "tools/list pagination did not terminate, truncating");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        serde_json::from_value(result).map_err(|e| McpError::Protocol(format!("tools/call: {e}")))
    }
}

fn into_result(response: Value) -> Result<Value, McpError> {
    if let Some(err) = response.get("error") {
        return Err(McpError::Rpc {
            code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    match response {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| McpError::Protocol("response has neither result nor error".into())),
        _ => Err(McpError::Protocol("response is not an object".into())),
    }
}

fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ─────────────────────────────────────────────
// Pipe tasks
// ─────────────────────────────────────────────

async fn write_loop(
    name: String,
    mut stdin: tokio::process::ChildStdin,
    mut rx: mpsc::Receiver<String>,
) {
    while let Some(line) = rx.recv().await {
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            error!(provider = %name, error = %e, "failed to write to MCP provider");
            break;
        }
    }
}

async fn read_loop(name: String, stdout: tokio::process::ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Ok(message) = serde_json::from_str::<Value>(&line) else {
                    debug!(provider = %name, line = %line, "ignoring non-JSON output");
                    continue;
                };
                // Server-initiated requests and notifications are ignored.
                let Some(key) = message.get("id").and_then(id_key) else {
                    continue;
                };
                if message.get("method").is_some() {
                    continue;
                }
                if let Some(sender) = pending.write().await.waiters.remove(&key) {
                    let _ = sender.send(message);
                }
            }
            Ok(None) => {
                debug!(provider = %name, "MCP provider stdout closed");
                break;
            }
            Err(e) => {
                warn!(provider = %name, error = %e, "error reading MCP provider stdout");
                break;
            }
        }
    }
    // Dropping the senders fails every waiting request with Disconnected.
    let mut pending = pending.write().await;
    pending.closed = true;
    pending.waiters.clear();
}

async fn stderr_loop(name: String, stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(provider = %name, "{}", line.trim_end());
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;

    /// A minimal provider in POSIX sh. Knows `echo`, `fail` and `slow`
    /// and serves `tools/list` in two pages.
    pub(crate) const FAKE_SERVER: &str = r##"
echo "fake server starting" >&2
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  [ -z "$id" ] && continue
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"fake","version":"0.1"}}}\n' "$id" ;;
    *'"method":"tools/list"'*)
      case "$line" in
        *'"cursor":"page2"'*)
          printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"fail","description":"Always fails"},{"name":"slow","description":"Never answers"}]}}\n' "$id" ;;
        *)
          printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"echo","description":"Echo text","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}}],"nextCursor":"page2"}}\n' "$id" ;;
      esac ;;
    *'"name":"fail"'*)
      printf '{"jsonrpc":"2.0","id":%s,"error":{"code":-32000,"message":"boom"}}\n' "$id" ;;
    *'"name":"slow"'*)
      ;;
    *'"method":"tools/call"'*)
      text=$(printf '%s' "$line" | sed -n 's/.*"text":"\([^"]*\)".*/\1/p')
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"echo: %s"}],"isError":false}}\n' "$id" "$text" ;;
  esac
done
"##;

    pub(crate) fn fake_launch(dir: &Path) -> StdioLaunch {
        let script = dir.join("fake_mcp.sh");
        std::fs::write(&script, FAKE_SERVER).unwrap();
        StdioLaunch {
            command: "sh".into(),
            args: vec![script.to_string_lossy().to_string()],
            env: HashMap::new(),
            cwd: None,
        }
    }

    #[test]
    fn test_into_result_error() {
        let err = into_result(json!({"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no such method"}}))
            .unwrap_err();
        match err {
            McpError::Rpc { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "no such method");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_into_result_missing_result() {
        assert!(matches!(
            into_result(json!({"jsonrpc":"2.0","id":1})),
            Err(McpError::Protocol(_))
        ));
    }

    #[test]
    fn test_call_result_defaults() {
        let r: CallToolResult = serde_json::from_value(json!({})).unwrap();
        assert!(r.content.is_empty());
        assert!(!r.is_error);
    }

    #[tokio::test]
    async fn test_handshake_and_paginated_list() {
        let dir = tempfile::tempdir().unwrap();
        let client = McpClient::connect("fake", &fake_launch(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();

        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "fail", "slow"]);
        assert!(tools[0].input_schema.is_some());
    }

    #[tokio::test]
    async fn test_call_tool_text() {
        let dir = tempfile::tempdir().unwrap();
        let client = McpClient::connect("fake", &fake_launch(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();

        let result = client.call_tool("echo", json!({"text": "hi"})).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0]["text"], "echo: hi");
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let client = McpClient::connect("fake", &fake_launch(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();

        let err = client.call_tool("fail", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let client = McpClient::connect("fake", &fake_launch(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();
        let client = McpClient {
            timeout: Duration::from_millis(300),
            ..client
        };

        let err = client.call_tool("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Timeout { .. }));
        assert!(client.pending.read().await.waiters.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let launch = StdioLaunch {
            command: "/nonexistent/toolrelay-mcp-binary".into(),
            ..Default::default()
        };
        let err = McpClient::connect("missing", &launch, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_exit_during_handshake_is_disconnected() {
        let launch = StdioLaunch {
            command: "sh".into(),
            args: vec!["-c".into(), "exit 0".into()],
            ..Default::default()
        };
        let err = McpClient::connect("quitter", &launch, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Disconnected));
    }
}
