//! MCP transports: a child process over stdio, or a streamable HTTP endpoint.

use super::protocol::{JsonRpcMessage, JsonRpcRequest};
use crate::config::{McpServerSettings, Settings};
use crate::error::{Result, WhatsNewError};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SESSION_HEADER: &str = "mcp-session-id";

/// A JSON-RPC channel to one MCP server.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its response's result.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value>;

    /// Send a notification; no response is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// Release the underlying process or session.
    async fn close(&self);
}

struct StdioIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Newline-delimited JSON-RPC over a child process's stdin/stdout.
pub struct StdioTransport {
    server: String,
    next_id: AtomicU64,
    /// Held across a write and the matching read so exchanges never interleave.
    io: Mutex<StdioIo>,
    child: Mutex<Option<Child>>,
}

impl StdioTransport {
    /// Launch the configured command.
    pub fn spawn(settings: &McpServerSettings) -> Result<Self> {
        let command = settings
            .command
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| WhatsNewError::mcp(&settings.name, "no command configured"))?;

        let mut cmd = Command::new(command);
        cmd.args(&settings.args)
            .envs(&settings.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &settings.cwd {
            cmd.current_dir(Settings::expand_path(cwd));
        }

        let mut child = cmd.spawn().map_err(|e| {
            WhatsNewError::mcp(&settings.name, format!("failed to launch '{}': {}", command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WhatsNewError::mcp(&settings.name, "child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WhatsNewError::mcp(&settings.name, "child stdout unavailable"))?;

        info!(server = %settings.name, "Launched MCP server: {} {}", command, settings.args.join(" "));

        Ok(Self {
            server: settings.name.clone(),
            next_id: AtomicU64::new(1),
            io: Mutex::new(StdioIo {
                stdin,
                stdout: BufReader::new(stdout),
            }),
            child: Mutex::new(Some(child)),
        })
    }

    fn error(&self, message: impl Into<String>) -> WhatsNewError {
        WhatsNewError::mcp(&self.server, message)
    }

    async fn write_line(&self, io: &mut StdioIo, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.error(format!("write failed: {}", e)))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| self.error(format!("flush failed: {}", e)))
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut io = self.io.lock().await;
        self.write_line(&mut io, &JsonRpcRequest::request(id, method, params))
            .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = io
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| self.error(format!("read failed: {}", e)))?;
            if read == 0 {
                return Err(self.error("server closed its output"));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcMessage>(trimmed) {
                Ok(message) if message.is_response_to(id) => {
                    return message.into_result().map_err(|m| self.error(m));
                }
                Ok(message) => {
                    debug!(server = %self.server, method = ?message.method, "Skipping unrelated message");
                }
                Err(_) => {
                    debug!(server = %self.server, "Skipping non JSON-RPC output: {}", trimmed);
                }
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut io = self.io.lock().await;
        self.write_line(&mut io, &JsonRpcRequest::notification(method, params))
            .await
    }

    async fn close(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!(server = %self.server, "Failed to stop MCP server: {}", e);
            } else {
                info!(server = %self.server, "MCP server stopped");
            }
        }
    }
}

/// JSON-RPC over HTTP POST, accepting JSON or SSE replies.
pub struct HttpTransport {
    server: String,
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn new(settings: &McpServerSettings) -> Result<Self> {
        let url = settings
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| WhatsNewError::mcp(&settings.name, "no url configured"))?;

        Ok(Self {
            server: settings.name.clone(),
            url,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        })
    }

    fn error(&self, message: impl Into<String>) -> WhatsNewError {
        WhatsNewError::mcp(&self.server, message)
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(session) = self.session_id.lock().await.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.error(format!("HTTP request failed: {}", e)))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(session.to_string());
        }

        if !response.status().is_success() {
            return Err(self.error(format!("HTTP {}", response.status())));
        }
        Ok(response)
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .post(&JsonRpcRequest::request(id, method, params))
            .await?;

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|e| self.error(format!("failed to read response: {}", e)))?;

        find_response(&body, is_sse, id)
            .ok_or_else(|| self.error(format!("no response to '{}' in reply", method)))?
            .into_result()
            .map_err(|m| self.error(m))
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.post(&JsonRpcRequest::notification(method, params))
            .await
            .map(|_| ())
    }

    async fn close(&self) {
        let Some(session) = self.session_id.lock().await.take() else {
            return;
        };
        match self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, session)
            .send()
            .await
        {
            Ok(_) => info!(server = %self.server, "MCP session closed"),
            Err(e) => warn!(server = %self.server, "Failed to close MCP session: {}", e),
        }
    }
}

/// Find the response to request `id` in an HTTP reply body.
pub(crate) fn find_response(body: &str, is_sse: bool, id: u64) -> Option<JsonRpcMessage> {
    let payloads = if is_sse {
        sse_data(body)
    } else {
        vec![body.to_string()]
    };

    payloads
        .iter()
        .filter_map(|payload| serde_json::from_str::<Value>(payload).ok())
        .flat_map(|value| match value {
            Value::Array(batch) => batch,
            single => vec![single],
        })
        .filter_map(|value| serde_json::from_value::<JsonRpcMessage>(value).ok())
        .find(|message| message.is_response_to(id))
}

/// Data payloads of the events in an SSE body.
fn sse_data(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_response_in_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}"#;
        let message = find_response(body, false, 2).unwrap();
        assert_eq!(message.into_result().unwrap()["tools"], serde_json::json!([]));
        assert!(find_response(body, false, 3).is_none());
    }

    #[test]
    fn test_find_response_in_batch() {
        let body = r#"[{"jsonrpc":"2.0","method":"notifications/message","params":{}},
                      {"jsonrpc":"2.0","id":5,"result":{}}]"#;
        assert!(find_response(body, false, 5).is_some());
    }

    #[test]
    fn test_find_response_in_sse_body() {
        let body = "event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\
                    \n\
                    event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":1,\n\
                    data: \"result\":{\"protocolVersion\":\"2025-03-26\"}}\n\
                    \n";
        let message = find_response(body, true, 1).unwrap();
        assert_eq!(message.into_result().unwrap()["protocolVersion"], "2025-03-26");
    }

    #[test]
    fn test_sse_data_without_trailing_blank_line() {
        assert_eq!(sse_data("data: {}"), vec!["{}".to_string()]);
        assert!(sse_data(": keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_stdio_requires_command() {
        let settings = McpServerSettings {
            name: "broken".to_string(),
            ..Default::default()
        };
        let err = StdioTransport::spawn(&settings).err().unwrap();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_http_requires_url() {
        let settings = McpServerSettings {
            name: "remote".to_string(),
            transport: crate::config::McpTransportKind::Http,
            ..Default::default()
        };
        assert!(HttpTransport::new(&settings).is_err());
    }

    #[tokio::test]
    async fn test_stdio_skips_noise_before_response() {
        let settings = McpServerSettings {
            name: "echo".to_string(),
            command: Some("sh".to_string()),
            args: vec![
                "-c".to_string(),
                r#"read line; echo 'starting up'; echo '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}'; sleep 5"#
                    .to_string(),
            ],
            ..Default::default()
        };

        let transport = StdioTransport::spawn(&settings).unwrap();
        let result = transport.request("ping", None).await.unwrap();
        assert_eq!(result["ok"], true);
        transport.close().await;
    }
}
