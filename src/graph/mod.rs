//! Explicit tool-calling graph.
//!
//! The model is called at the `llm` node. If its reply carries tool calls the
//! run moves to the `tools` node, appends one tool result per call, and goes
//! back to `llm`. Otherwise the run ends.

mod model;
mod router;
mod runner;

pub use model::{from_response, to_request_messages, tool_definitions, ChatModel, OpenAiChatModel};
pub use router::{should_continue, Node, Route};
pub use runner::{GraphRun, ToolCallRecord, UpdateGraph, DEFAULT_MAX_ITERATIONS};
