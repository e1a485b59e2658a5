//! Application wiring.
//!
//! Builds the model client, the feed fetcher, the MCP sessions and the graphs
//! once at startup, and tears the MCP sessions down on shutdown.

use crate::config::Settings;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::feed::{FeedFetcher, RssFeedFetcher};
use crate::graph::{ChatModel, OpenAiChatModel, UpdateGraph};
use crate::mcp::McpToolLoader;
use crate::tools::{AwsUpdatesTool, Toolset, GET_AWS_UPDATES};
use std::sync::Arc;
use tracing::{info, warn};

/// Owned application state shared by every request.
pub struct Orchestrator {
    settings: Settings,
    graph: UpdateGraph,
    mcp_graph: Option<UpdateGraph>,
    mcp: Option<Arc<McpToolLoader>>,
}

impl Orchestrator {
    /// Build the orchestrator, connecting to MCP servers if `with_mcp` is set
    /// and MCP is enabled in the settings.
    pub async fn init(settings: Settings, with_mcp: bool) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(&settings.model)?);
        let fetcher: Arc<dyn FeedFetcher> = Arc::new(RssFeedFetcher::new(&settings.feed.url));

        let mcp = if with_mcp && settings.mcp.enabled {
            let loader = McpToolLoader::connect(&settings.mcp, &[GET_AWS_UPDATES]).await;
            if loader.has_tools() {
                info!(
                    "MCP ready: {} tools from {} server(s)",
                    loader.tool_count(),
                    loader.server_count()
                );
                Some(Arc::new(loader))
            } else {
                warn!("No MCP tools loaded, MCP routes use built-in tools only");
                loader.shutdown().await;
                None
            }
        } else {
            None
        };

        info!(
            "Using model {} at {}",
            settings.model.name, settings.model.api_base
        );
        Ok(Self::from_parts(settings, model, fetcher, mcp))
    }

    /// Assemble an orchestrator from already built parts.
    pub fn from_parts(
        settings: Settings,
        model: Arc<dyn ChatModel>,
        fetcher: Arc<dyn FeedFetcher>,
        mcp: Option<Arc<McpToolLoader>>,
    ) -> Self {
        let tools = Toolset::new(AwsUpdatesTool::new(fetcher, settings.feed.max_updates));
        let graph = UpdateGraph::new(model.clone(), tools.clone())
            .with_max_iterations(settings.agent.max_iterations);

        let mcp_graph = mcp.as_ref().map(|loader| {
            UpdateGraph::new(model, tools.with_mcp(loader.clone()))
                .with_max_iterations(settings.agent.max_iterations)
        });

        Self {
            settings,
            graph,
            mcp_graph,
            mcp,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Graph bound to the built-in tools only.
    pub fn graph(&self) -> &UpdateGraph {
        &self.graph
    }

    /// Graph bound to the built-in tools plus MCP tools.
    ///
    /// Falls back to the built-in graph when MCP is unavailable.
    pub fn mcp_graph(&self) -> &UpdateGraph {
        match &self.mcp_graph {
            Some(graph) => graph,
            None => {
                warn!("MCP tools unavailable, using built-in tools only");
                &self.graph
            }
        }
    }

    /// Initial conversation for a user request.
    pub fn conversation(&self, content: impl Into<String>) -> Conversation {
        Conversation::from_user(content, self.settings.agent.system_prompt.as_deref())
    }

    /// Release MCP sessions and child processes.
    pub async fn shutdown(&self) {
        if let Some(mcp) = &self.mcp {
            mcp.shutdown().await;
            info!("MCP sessions closed");
        }
    }
}
