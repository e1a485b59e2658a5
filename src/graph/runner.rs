//! Two-node graph runner: `llm` and `tools`, joined by a conditional edge.

use super::model::ChatModel;
use super::router::{should_continue, Node};
use crate::conversation::{Conversation, Message};
use crate::error::{Result, WhatsNewError};
use crate::tools::Toolset;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default bound on model calls per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Graph that answers AWS update questions, calling tools as the model asks.
///
/// START -> llm; llm -> tools | END; tools -> llm.
#[derive(Clone)]
pub struct UpdateGraph {
    model: Arc<dyn ChatModel>,
    tools: Toolset,
    max_iterations: usize,
}

impl UpdateGraph {
    pub fn new(model: Arc<dyn ChatModel>, tools: Toolset) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set maximum number of model calls per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &Toolset {
        &self.tools
    }

    /// Run the graph to completion, starting at the `llm` node.
    pub async fn invoke(&self, mut conversation: Conversation) -> Result<GraphRun> {
        let specs = self.tools.specs();
        let mut node = Node::Llm;
        let mut iterations = 0;
        let mut tool_calls = Vec::new();

        loop {
            match node {
                Node::Llm => {
                    iterations += 1;
                    if iterations > self.max_iterations {
                        return Err(WhatsNewError::Agent(format!(
                            "Graph exceeded maximum iterations ({})",
                            self.max_iterations
                        )));
                    }

                    debug!("Graph iteration {} ({})", iterations, self.model.name());
                    let reply = self.model.invoke(conversation.messages(), &specs).await?;
                    conversation.push(reply);

                    match should_continue(conversation.messages()).next_node() {
                        Some(next) => node = next,
                        None => {
                            return Ok(GraphRun {
                                conversation,
                                tool_calls,
                                iterations,
                            })
                        }
                    }
                }
                Node::Tools => {
                    let pending = conversation
                        .last()
                        .and_then(Message::pending_tool_calls)
                        .map(<[_]>::to_vec)
                        .unwrap_or_default();

                    for call in pending {
                        let result = match self.tools.execute(&call).await {
                            Ok(output) => output,
                            Err(e @ WhatsNewError::FeedFetch(_)) => return Err(e),
                            Err(e) => {
                                warn!("Tool {} failed: {}", call.name, e);
                                format!("Error: {}\n Please fix your mistakes.", e)
                            }
                        };

                        conversation.push(Message::tool_result(&call, result.clone()));
                        tool_calls.push(ToolCallRecord {
                            name: call.name,
                            arguments: call.arguments,
                            result,
                        });
                    }

                    node = Node::Llm;
                }
            }
        }
    }
}

/// Outcome of a completed graph run.
#[derive(Debug)]
pub struct GraphRun {
    /// Full conversation, ending with the model's final message.
    pub conversation: Conversation,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
}

impl GraphRun {
    /// The model's final answer.
    pub fn answer(&self) -> &str {
        self.conversation.final_answer().unwrap_or_default()
    }

    pub fn log_summary(&self) {
        info!(
            iterations = self.iterations,
            tool_calls = self.tool_calls.len(),
            messages = self.conversation.len(),
            "Graph run finished: {}",
            self.answer()
        );
    }
}

/// Record of a tool call made during a run.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
