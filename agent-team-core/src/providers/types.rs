use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tools::ToolSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool call requested by the model. `arguments` is the raw JSON text the
/// model produced and is parsed only by the agent loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn generate_id() -> String {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Tool name on tool-result turns.
    pub name: Option<String>,
    /// Pending invocation on assistant tool-call turns.
    pub tool_call: Option<ToolInvocation>,
    /// Call id a tool-result turn answers.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_tool_call(invocation: ToolInvocation) -> Self {
        Self {
            tool_call: Some(invocation),
            ..Self::plain(Role::Assistant, "")
        }
    }

    pub fn tool_result(invocation: &ToolInvocation, content: impl Into<String>) -> Self {
        Self {
            name: Some(invocation.name.clone()),
            tool_call_id: Some(invocation.id.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides between answering and calling a tool.
    Auto,
    /// No tools are offered.
    None,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolSchema],
    pub tool_choice: ToolChoice,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(messages: &'a [ChatMessage], tools: &'a [ToolSchema]) -> Self {
        let tool_choice = if tools.is_empty() {
            ToolChoice::None
        } else {
            ToolChoice::Auto
        };
        Self {
            messages,
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    ToolCall(ToolInvocation),
    Content(String),
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply>;
}
