//! Tools the chat model may call.
//!
//! The built-in `getAwsUpdates` tool is always present. Tools discovered from
//! MCP servers can be merged in; on a name clash the built-in tool wins.

mod aws_updates;

pub use aws_updates::{AwsUpdatesTool, GetAwsUpdatesArgs, GET_AWS_UPDATES};

use crate::conversation::ToolCallRequest;
use crate::error::{Result, WhatsNewError};
use crate::mcp::McpToolLoader;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Built-in tools, parsed from a model tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinTool {
    GetAwsUpdates(GetAwsUpdatesArgs),
}

/// Parse a tool call into a built-in tool.
///
/// Returns `Ok(None)` when `name` is not a built-in tool.
pub fn parse_builtin(name: &str, arguments: &str) -> Result<Option<BuiltinTool>> {
    match name {
        GET_AWS_UPDATES => Ok(Some(BuiltinTool::GetAwsUpdates(GetAwsUpdatesArgs::parse(
            arguments,
        )?))),
        _ => Ok(None),
    }
}

/// The set of tools bound to one graph.
#[derive(Clone)]
pub struct Toolset {
    aws_updates: AwsUpdatesTool,
    mcp: Option<Arc<McpToolLoader>>,
}

impl Toolset {
    pub fn new(aws_updates: AwsUpdatesTool) -> Self {
        Self {
            aws_updates,
            mcp: None,
        }
    }

    /// Add the tools discovered from MCP servers.
    pub fn with_mcp(mut self, loader: Arc<McpToolLoader>) -> Self {
        self.mcp = Some(loader);
        self
    }

    pub fn has_mcp(&self) -> bool {
        self.mcp.is_some()
    }

    /// Specifications of every tool, built-ins first.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = vec![self.aws_updates.spec()];
        if let Some(loader) = &self.mcp {
            specs.extend(
                loader
                    .specs()
                    .into_iter()
                    .filter(|spec| spec.name != GET_AWS_UPDATES),
            );
        }
        specs
    }

    /// Execute a tool call and return its textual result.
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<String> {
        info!("Calling tool: {} with args: {}", call.name, call.arguments);

        if let Some(tool) = parse_builtin(&call.name, &call.arguments)? {
            return match tool {
                BuiltinTool::GetAwsUpdates(args) => self.aws_updates.run(&args.service_name).await,
            };
        }

        match &self.mcp {
            Some(loader) if loader.contains(&call.name) => {
                debug!(
                    "Routing {} to MCP server '{}'",
                    call.name,
                    loader.server_for(&call.name).unwrap_or_default()
                );
                let arguments = if call.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        WhatsNewError::Tool(format!("Invalid arguments for {}: {}", call.name, e))
                    })?
                };
                loader.call_tool(&call.name, arguments).await
            }
            _ => {
                warn!("Model requested unknown tool: {}", call.name);
                Err(WhatsNewError::Tool(format!("Unknown tool: {}", call.name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedFetcher, FeedItem};
    use async_trait::async_trait;

    struct EmptyFeed;

    #[async_trait]
    impl FeedFetcher for EmptyFeed {
        async fn fetch(&self) -> Result<Vec<FeedItem>> {
            Ok(Vec::new())
        }
    }

    fn toolset() -> Toolset {
        Toolset::new(AwsUpdatesTool::new(Arc::new(EmptyFeed), 3))
    }

    fn call(name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_0".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_parse_builtin() {
        let tool = parse_builtin("getAwsUpdates", r#"{"serviceName": "s3"}"#).unwrap();
        assert_eq!(
            tool,
            Some(BuiltinTool::GetAwsUpdates(GetAwsUpdatesArgs {
                service_name: "s3".to_string()
            }))
        );
        assert_eq!(parse_builtin("read_file", "{}").unwrap(), None);
        assert!(parse_builtin("getAwsUpdates", "{}").is_err());
    }

    #[test]
    fn test_specs_without_mcp() {
        let specs = toolset().specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, GET_AWS_UPDATES);
        assert!(!toolset().has_mcp());
    }

    #[tokio::test]
    async fn test_execute_builtin() {
        let output = toolset()
            .execute(&call("getAwsUpdates", r#"{"serviceName":"s3"}"#))
            .await
            .unwrap();
        assert_eq!(output, "[]");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let err = toolset().execute(&call("rm_rf", "{}")).await.unwrap_err();
        assert!(matches!(err, WhatsNewError::Tool(_)));
        assert!(err.to_string().contains("rm_rf"));
    }
}
