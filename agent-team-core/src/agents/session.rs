use serde_json::Value;

use crate::providers::types::{ChatMessage, Role, ToolInvocation};

/// Ordered turns of one agent conversation, starting with the system prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    turns: Vec<ChatMessage>,
}

impl Session {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            turns: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.turns.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.turns.push(ChatMessage::assistant(content));
    }

    /// Appends a tool call together with its result so the pair can never be
    /// split by another turn.
    pub fn push_tool_exchange(&mut self, invocation: ToolInvocation, result: &Value) {
        let result_turn = ChatMessage::tool_result(&invocation, result.to_string());
        self.turns.push(ChatMessage::assistant_tool_call(invocation));
        self.turns.push(result_turn);
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_user_turns(&self) -> bool {
        self.turns.iter().any(|turn| turn.role == Role::User)
    }

    /// Plain-text rendering used for conversation summaries.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| match (&turn.tool_call, turn.role) {
                (Some(call), _) => format!("assistant: [call {}({})]", call.name, call.arguments),
                (None, Role::Tool) => format!(
                    "tool {}: {}",
                    turn.name.as_deref().unwrap_or("unknown"),
                    turn.content
                ),
                (None, role) => format!("{}: {}", role.as_str(), turn.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
