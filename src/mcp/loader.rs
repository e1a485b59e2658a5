//! Tools gathered from several MCP servers.

use super::client::McpClient;
use super::protocol::Tool;
use crate::config::McpSettings;
use crate::error::{Result, WhatsNewError};
use crate::tools::ToolSpec;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

struct LoadedTool {
    tool: Tool,
    client: usize,
}

/// Owns the MCP sessions and the tools they expose.
///
/// Tool names are unique across servers. The first server to offer a name
/// keeps it, and reserved names are never taken.
#[derive(Default)]
pub struct McpToolLoader {
    clients: Vec<McpClient>,
    tools: Vec<LoadedTool>,
    index: HashMap<String, usize>,
}

impl McpToolLoader {
    /// Connect to every configured server concurrently and list their tools.
    ///
    /// A server that cannot be reached is logged and skipped.
    pub async fn connect(settings: &McpSettings, reserved: &[&str]) -> Self {
        let mut loader = Self::default();
        if !settings.enabled {
            return loader;
        }

        let sessions = join_all(settings.servers.iter().map(|server| async move {
            let client = McpClient::connect(server).await?;
            match client.list_tools().await {
                Ok(tools) => Ok::<_, WhatsNewError>((client, tools)),
                Err(e) => {
                    client.close().await;
                    Err(e)
                }
            }
        }))
        .await;

        for (server, session) in settings.servers.iter().zip(sessions) {
            match session {
                Ok((client, tools)) => {
                    let registered = loader.add_client(client, tools, reserved);
                    info!("Loaded {} tools from MCP server '{}'", registered, server.name);
                }
                Err(e) => warn!("Skipping MCP server '{}': {}", server.name, e),
            }
        }

        loader
    }

    /// Register a connected client and its tools. Returns how many were kept.
    pub fn add_client(&mut self, client: McpClient, tools: Vec<Tool>, reserved: &[&str]) -> usize {
        let client_idx = self.clients.len();
        let mut registered = 0;

        for tool in tools {
            if reserved.contains(&tool.name.as_str()) || self.index.contains_key(&tool.name) {
                warn!(
                    "MCP tool '{}' from '{}' conflicts with an existing tool, skipping",
                    tool.name,
                    client.name()
                );
                continue;
            }
            self.index.insert(tool.name.clone(), self.tools.len());
            self.tools.push(LoadedTool {
                tool,
                client: client_idx,
            });
            registered += 1;
        }

        self.clients.push(client);
        registered
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn server_count(&self) -> usize {
        self.clients.len()
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.index.contains_key(tool_name)
    }

    /// Name of the server that provides `tool_name`.
    pub fn server_for(&self, tool_name: &str) -> Option<&str> {
        self.index
            .get(tool_name)
            .map(|&idx| self.clients[self.tools[idx].client].name())
    }

    /// Specifications of all loaded tools, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|loaded| ToolSpec {
                name: loaded.tool.name.clone(),
                description: loaded.tool.description.clone().unwrap_or_default(),
                parameters: loaded.tool.input_schema.clone(),
            })
            .collect()
    }

    /// Forward a tool call to the server that owns the tool.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String> {
        let idx = self
            .index
            .get(tool_name)
            .ok_or_else(|| WhatsNewError::Tool(format!("Unknown tool: {}", tool_name)))?;
        self.clients[self.tools[*idx].client]
            .call_tool(tool_name, arguments)
            .await
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        join_all(self.clients.iter().map(|client| client.close())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::client::tests::FakeTransport;
    use crate::tools::GET_AWS_UPDATES;
    use serde_json::json;

    async fn fake_client(name: &str, tools: &[&str]) -> (McpClient, Vec<Tool>) {
        let client = McpClient::initialize(name, Box::new(FakeTransport::with_tools(tools)))
            .await
            .unwrap();
        let tools = client.list_tools().await.unwrap();
        (client, tools)
    }

    #[tokio::test]
    async fn test_collisions_are_skipped() {
        let mut loader = McpToolLoader::default();

        let (fs, fs_tools) = fake_client("file-system", &["read_file", "getAwsUpdates"]).await;
        assert_eq!(loader.add_client(fs, fs_tools, &[GET_AWS_UPDATES]), 1);

        let (kb, kb_tools) = fake_client("aws-knowledge", &["read_file", "search_documentation"]).await;
        assert_eq!(loader.add_client(kb, kb_tools, &[GET_AWS_UPDATES]), 1);

        assert_eq!(loader.tool_count(), 2);
        assert_eq!(loader.server_count(), 2);
        assert_eq!(loader.server_for("read_file"), Some("file-system"));
        assert_eq!(loader.server_for("search_documentation"), Some("aws-knowledge"));
        assert!(!loader.contains(GET_AWS_UPDATES));

        let names: Vec<_> = loader.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["read_file", "search_documentation"]);
    }

    #[tokio::test]
    async fn test_call_routes_to_owner() {
        let mut loader = McpToolLoader::default();
        let (kb, kb_tools) = fake_client("aws-knowledge", &["search_documentation"]).await;
        loader.add_client(kb, kb_tools, &[]);

        let output = loader
            .call_tool("search_documentation", json!({"search_phrase": "S3"}))
            .await
            .unwrap();
        assert_eq!(output, "called");

        assert!(loader.call_tool("missing", json!({})).await.is_err());
        loader.shutdown().await;
    }

    #[tokio::test]
    async fn test_disabled_connects_nothing() {
        let settings = McpSettings {
            enabled: false,
            ..Default::default()
        };
        let loader = McpToolLoader::connect(&settings, &[]).await;
        assert!(!loader.has_tools());
        assert_eq!(loader.server_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_servers_are_skipped() {
        let settings = McpSettings {
            enabled: true,
            servers: vec![crate::config::McpServerSettings {
                name: "ghost".to_string(),
                command: Some("/nonexistent/mcp-server".to_string()),
                ..Default::default()
            }],
        };
        let loader = McpToolLoader::connect(&settings, &[]).await;
        assert_eq!(loader.server_count(), 0);
    }
}
