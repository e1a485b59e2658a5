//! Tools command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// List the tool specifications the model would be given.
pub async fn run_tools(mcp: bool, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::init(settings, mcp).await?;
    let graph = if mcp {
        orchestrator.mcp_graph()
    } else {
        orchestrator.graph()
    };

    let specs = graph.tools().specs();
    Output::header(&format!("Tools ({})", specs.len()));
    println!();
    for spec in &specs {
        Output::tool(&spec.name, &spec.description);
    }

    if mcp && !graph.tools().has_mcp() {
        println!();
        Output::warning("MCP is disabled or no MCP server could be reached.");
    }

    orchestrator.shutdown().await;
    Ok(())
}
