//! Chat model seam and its OpenAI-compatible implementation.

use crate::config::ModelSettings;
use crate::conversation::{Message, ToolCallRequest};
use crate::error::{Result, WhatsNewError};
use crate::openai::create_client;
use crate::tools::ToolSpec;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// A chat model that can be bound to tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next AI message for `messages`.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

/// Chat model reached through an OpenAI-compatible completions API.
pub struct OpenAiChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.name.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model)
            .messages(to_request_messages(messages)?);
        if !tools.is_empty() {
            request.tools(tool_definitions(tools));
        }
        let request = request
            .build()
            .map_err(|e| WhatsNewError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| WhatsNewError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| WhatsNewError::Agent("No response from model".to_string()))?;

        debug!(
            tool_calls = choice.message.tool_calls.as_ref().map_or(0, Vec::len),
            "Model replied"
        );
        Ok(from_response(choice.message))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Convert tool specifications into OpenAI function definitions.
pub fn tool_definitions(tools: &[ToolSpec]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.parameters.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Convert the conversation into request messages.
pub fn to_request_messages(messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages.iter().map(to_request_message).collect()
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let built: ChatCompletionRequestMessage = match message {
        Message::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| WhatsNewError::Agent(e.to_string()))?
            .into(),
        Message::Human { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| WhatsNewError::Agent(e.to_string()))?
            .into(),
        Message::Ai {
            content,
            tool_calls,
        } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !content.is_empty() {
                args.content(content.clone());
            }
            if let Some(calls) = tool_calls.as_ref().filter(|c| !c.is_empty()) {
                args.tool_calls(calls.iter().map(to_openai_tool_call).collect::<Vec<_>>());
            }
            args.build()
                .map_err(|e| WhatsNewError::Agent(e.to_string()))?
                .into()
        }
        Message::Tool {
            tool_call_id,
            content,
            ..
        } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(tool_call_id.clone())
            .content(content.clone())
            .build()
            .map_err(|e| WhatsNewError::Agent(e.to_string()))?
            .into(),
    };
    Ok(built)
}

fn to_openai_tool_call(call: &ToolCallRequest) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    }
}

/// Convert a response message into an AI message.
pub fn from_response(message: ChatCompletionResponseMessage) -> Message {
    let tool_calls = message.tool_calls.map(|calls| {
        calls
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect()
    });

    Message::Ai {
        content: message.content.unwrap_or_default(),
        tool_calls,
    }
}
