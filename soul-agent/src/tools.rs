//! External tool directory.
//!
//! The soul only ever *lists* tools; it reflects on them but never invokes
//! one. Two directories:
//!
//! - [`StaticToolDirectory`]: an in-process map of server → tools.
//! - [`StdioToolDirectory`]: Model Context Protocol servers spawned as child
//!   processes and spoken to with JSON-RPC 2.0 over stdio. Each session
//!   performs the `initialize` handshake on connect, and its child is killed
//!   on close or drop.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use soul_core::config::ToolsConfig;

use crate::error::AgentError;

/// MCP protocol revision announced during the handshake.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// A tool advertised by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// What the tool does, if the server says.
    #[serde(default)]
    pub description: Option<String>,
}

impl ToolDescriptor {
    /// Descriptor with a name and description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }
}

/// Somewhere tools can be discovered.
#[async_trait]
pub trait ToolDirectory: Send + Sync {
    /// Names of the servers with an open session.
    async fn active_servers(&self) -> Vec<String>;

    /// Tools offered by `server`. Unknown servers yield an empty list.
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, AgentError>;

    /// Release every session.
    async fn close_all(&self);
}

// ---------------------------------------------------------------------------
// Static
// ---------------------------------------------------------------------------

/// In-process directory. Empty by default, which disables tool reflection.
#[derive(Debug, Default)]
pub struct StaticToolDirectory {
    servers: parking_lot::Mutex<BTreeMap<String, Vec<ToolDescriptor>>>,
}

impl StaticToolDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_server(self, name: impl Into<String>, tools: Vec<ToolDescriptor>) -> Self {
        self.insert(name, tools);
        self
    }

    /// Register (or replace) a server.
    pub fn insert(&self, name: impl Into<String>, tools: Vec<ToolDescriptor>) {
        self.servers.lock().insert(name.into(), tools);
    }

    /// Remove a server. Returns `true` if it was registered.
    pub fn remove(&self, name: &str) -> bool {
        self.servers.lock().remove(name).is_some()
    }
}

#[async_trait]
impl ToolDirectory for StaticToolDirectory {
    async fn active_servers(&self) -> Vec<String> {
        self.servers.lock().keys().cloned().collect()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, AgentError> {
        Ok(self.servers.lock().get(server).cloned().unwrap_or_default())
    }

    async fn close_all(&self) {
        self.servers.lock().clear();
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC over stdio
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// One live server process.
struct McpSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    timeout: Duration,
}

impl McpSession {
    async fn spawn(command: &str, args: &[String], timeout: Duration) -> Result<Self, AgentError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Tool(format!("failed to spawn '{command}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Tool("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Tool("child stdout unavailable".into()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            timeout,
        };
        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&mut self) -> Result<(), AgentError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "soul", "version": env!("CARGO_PKG_VERSION") },
        });
        let result = self.request("initialize", Some(params)).await?;
        debug!(
            server = %result["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            "MCP handshake complete"
        );
        self.notify("notifications/initialized").await
    }

    async fn send(&mut self, message: &JsonRpcRequest<'_>) -> Result<(), AgentError> {
        let mut line = serde_json::to_string(message).map_err(|e| AgentError::Tool(e.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn notify(&mut self, method: &str) -> Result<(), AgentError> {
        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        })
        .await
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, AgentError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        })
        .await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_response(id))
            .await
            .map_err(|_| AgentError::Tool(format!("'{method}' timed out after {}ms", timeout.as_millis())))?
    }

    /// Read lines until the response carrying `id`; skip notifications and noise.
    async fn read_response(&mut self, id: u64) -> Result<Value, AgentError> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| AgentError::Tool("server closed its output".into()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(message) = serde_json::from_str::<JsonRpcResponse>(line) else {
                debug!(line, "Ignoring non-JSON-RPC output");
                continue;
            };
            if message.id.as_ref().and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(err) = message.error {
                return Err(AgentError::Tool(format!("{} (code {})", err.message, err.code)));
            }
            return Ok(message.result.unwrap_or(Value::Null));
        }
    }

    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, AgentError> {
        let result = self.request("tools/list", Some(json!({}))).await?;
        let parsed: ToolsListResult =
            serde_json::from_value(result).map_err(|e| AgentError::Tool(e.to_string()))?;
        Ok(parsed.tools)
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "MCP server already gone");
        }
    }
}

/// Directory of MCP servers reached over stdio.
pub struct StdioToolDirectory {
    sessions: tokio::sync::Mutex<BTreeMap<String, McpSession>>,
    timeout: Duration,
}

impl std::fmt::Debug for StdioToolDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioToolDirectory")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StdioToolDirectory {
    /// Directory with no sessions, using `[tools]` config.
    #[must_use]
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            sessions: tokio::sync::Mutex::new(BTreeMap::new()),
            timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Spawn `command args...`, run the handshake, and register it as `server`.
    /// An existing session with the same name is closed first.
    ///
    /// # Errors
    /// Returns [`AgentError::Tool`] if the process cannot be spawned or the
    /// handshake fails; the child is killed in that case.
    pub async fn connect(&self, server: &str, command: &str, args: &[String]) -> Result<(), AgentError> {
        self.close(server).await;
        let session = McpSession::spawn(command, args, self.timeout).await?;
        self.sessions.lock().await.insert(server.to_string(), session);
        info!(server, command, "Tool server connected");
        Ok(())
    }

    /// Close one session. Returns `true` if it existed.
    pub async fn close(&self, server: &str) -> bool {
        let session = self.sessions.lock().await.remove(server);
        match session {
            Some(session) => {
                session.shutdown().await;
                info!(server, "Tool server closed");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ToolDirectory for StdioToolDirectory {
    async fn active_servers(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, AgentError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(server) else {
            return Ok(Vec::new());
        };
        let result = session.list_tools().await;
        if let Err(e) = &result {
            warn!(server, error = %e, "Tool listing failed");
        }
        result
    }

    async fn close_all(&self) {
        let sessions = std::mem::take(&mut *self.sessions.lock().await);
        for (server, session) in sessions {
            session.shutdown().await;
            debug!(server = %server, "Tool server closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_directory_lifecycle() {
        let dir = StaticToolDirectory::new()
            .with_server("fs", vec![ToolDescriptor::new("read_file", "Read a file")]);
        assert_eq!(dir.active_servers().await, vec!["fs".to_string()]);
        assert_eq!(dir.list_tools("fs").await.expect("list").len(), 1);
        assert!(dir.list_tools("nope").await.expect("list").is_empty());

        dir.insert("web", Vec::new());
        assert!(dir.remove("fs"));
        assert!(!dir.remove("fs"));
        assert_eq!(dir.active_servers().await, vec!["web".to_string()]);

        dir.close_all().await;
        assert!(dir.active_servers().await.is_empty());
    }

    #[test]
    fn request_omits_absent_fields() {
        let note = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        let text = serde_json::to_string(&note).expect("serialize");
        assert_eq!(text, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdio_handshake_and_listing() {
        // A scripted server: answer initialize, swallow the notification,
        // answer tools/list, then idle until killed.
        let script = r#"read l; echo '{"jsonrpc":"2.0","id":1,"result":{"serverInfo":{"name":"fake"}}}'; read l; read l; echo 'log noise'; echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"read_file","description":"Read a file"}]}}'; sleep 30"#;
        let dir = StdioToolDirectory::new(&ToolsConfig::default());
        dir.connect("fake", "sh", &["-c".to_string(), script.to_string()])
            .await
            .expect("connect");
        assert_eq!(dir.active_servers().await, vec!["fake".to_string()]);

        let tools = dir.list_tools("fake").await.expect("list");
        assert_eq!(tools, vec![ToolDescriptor::new("read_file", "Read a file")]);

        assert!(dir.close("fake").await);
        assert!(!dir.close("fake").await);
        assert!(dir.active_servers().await.is_empty());
    }

    #[tokio::test]
    async fn missing_command_is_a_tool_error() {
        let dir = StdioToolDirectory::new(&ToolsConfig::default());
        let err = dir
            .connect("ghost", "definitely-not-a-real-binary-xyz", &[])
            .await
            .expect_err("spawn fails");
        assert!(matches!(err, AgentError::Tool(_)));
        assert!(dir.active_servers().await.is_empty());
    }
}
