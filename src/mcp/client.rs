//! MCP client session for a single server.

use super::protocol::{
    ClientInfo, InitializeParams, InitializeResult, Tool, ToolCallParams, ToolCallResult,
    ToolsListResult,
};
use super::transport::{HttpTransport, McpTransport, StdioTransport};
use crate::config::{McpServerSettings, McpTransportKind};
use crate::error::{Result, WhatsNewError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

pub const PROTOCOL_VERSION: &str = "2025-03-26";
const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An initialized session with one MCP server.
pub struct McpClient {
    name: String,
    transport: Box<dyn McpTransport>,
}

impl McpClient {
    /// Open the configured transport and run the initialize handshake.
    pub async fn connect(settings: &McpServerSettings) -> Result<Self> {
        let transport: Box<dyn McpTransport> = match settings.transport {
            McpTransportKind::Stdio => Box::new(StdioTransport::spawn(settings)?),
            McpTransportKind::Http => Box::new(HttpTransport::new(settings)?),
        };

        Self::initialize(&settings.name, transport).await
    }

    /// Run the initialize handshake over an already open transport.
    #[instrument(skip(transport))]
    pub async fn initialize(name: &str, transport: Box<dyn McpTransport>) -> Result<Self> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: CLIENT_NAME.to_string(),
                version: CLIENT_VERSION.to_string(),
            },
        };

        let client = Self {
            name: name.to_string(),
            transport,
        };

        match client.handshake(params).await {
            Ok(()) => Ok(client),
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, params: InitializeParams) -> Result<()> {
        let result = self
            .transport
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        let init: InitializeResult = self.decode(result)?;

        info!(
            server = %self.name,
            protocol = %init.protocol_version,
            "Connected to MCP server {}",
            init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("(unnamed)")
        );

        self.transport
            .notify("notifications/initialized", None)
            .await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// List every tool the server offers, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let page: ToolsListResult = self
                .decode(self.transport.request("tools/list", Some(params)).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(server = %self.name, "Listed {} tools", tools.len());
        Ok(tools)
    }

    /// Call a tool and return its text output.
    ///
    /// A result flagged `isError` becomes [`WhatsNewError::Tool`].
    #[instrument(skip(self, arguments), fields(server = %self.name))]
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<String> {
        let params = ToolCallParams {
            name: tool.to_string(),
            arguments,
        };
        let result: ToolCallResult = self.decode(
            self.transport
                .request("tools/call", Some(serde_json::to_value(params)?))
                .await?,
        )?;

        let text = result.text();
        if result.is_error {
            return Err(WhatsNewError::Tool(format!("{} failed: {}", tool, text)));
        }
        Ok(text)
    }

    /// Close the session.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    fn decode<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| WhatsNewError::mcp(&self.name, format!("unexpected reply: {}", e)))
    }
}
