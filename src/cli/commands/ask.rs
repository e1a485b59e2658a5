//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the graph once for a question and print the answer.
pub async fn run_ask(question: &str, mcp: bool, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::init(settings, mcp).await?;
    let graph = if mcp {
        orchestrator.mcp_graph()
    } else {
        orchestrator.graph()
    };

    let spinner = Output::spinner("Searching AWS updates...");
    let result = graph.invoke(orchestrator.conversation(question)).await;
    spinner.finish_and_clear();

    let outcome = match result {
        Ok(run) => {
            println!("\n{}\n", run.answer());

            if !run.tool_calls.is_empty() {
                Output::header(&format!("Tool Calls ({})", run.tool_calls.len()));
                for call in &run.tool_calls {
                    Output::tool_call(&call.to_string(), &call.result);
                }
            }
            println!();
            Output::kv("Iterations", &run.iterations.to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            Err(e.into())
        }
    };

    orchestrator.shutdown().await;
    outcome
}
