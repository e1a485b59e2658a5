//! Conversation state for one graph run.

/// A model-issued request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Identifier echoed back in the matching tool result.
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

impl std::fmt::Display for ToolCallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One message in the conversation, tagged by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: String,
        /// `None` when the model sent no tool-calls field at all.
        tool_calls: Option<Vec<ToolCallRequest>>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// An AI message with no tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: Some(calls),
        }
    }

    /// Result of running the tool call `call`.
    pub fn tool_result(call: &ToolCallRequest, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
        }
    }

    /// Tool calls still waiting to run, if this is an AI message that made any.
    pub fn pending_tool_calls(&self) -> Option<&[ToolCallRequest]> {
        match self {
            Message::Ai {
                tool_calls: Some(calls),
                ..
            } if !calls.is_empty() => Some(calls),
            _ => None,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::Ai { .. } => "ai",
            Message::Tool { .. } => "tool",
        }
    }
}

/// Ordered, append-only message history owned by a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from the user's message, with an optional system prompt.
    pub fn from_user(content: impl Into<String>, system_prompt: Option<&str>) -> Self {
        let mut conversation = Self::new();
        if let Some(prompt) = system_prompt {
            conversation.push(Message::system(prompt));
        }
        conversation.push(Message::human(content));
        conversation
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the last AI message, i.e. the final answer once a run ends.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Ai { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}
