//! Conditional edge out of the `llm` node.

use crate::conversation::Message;

/// Graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Call the chat model.
    Llm,
    /// Execute the pending tool calls.
    Tools,
}

/// Where to go after the model has replied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    End,
}

impl Route {
    /// Node to enter next, or `None` when the run is over.
    pub fn next_node(self) -> Option<Node> {
        match self {
            Route::Tools => Some(Node::Tools),
            Route::End => None,
        }
    }
}

/// Continue to the tools node iff the last message is an AI message with at
/// least one tool call. Anything else, including an empty history, ends the run.
pub fn should_continue(messages: &[Message]) -> Route {
    match messages.last().and_then(Message::pending_tool_calls) {
        Some(_) => Route::Tools,
        None => Route::End,
    }
}
