use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key marking a message as part of the shared team thread.
pub const TEAM_THREAD_FLAG: &str = "is_team_thread";

/// A message about to be appended to a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub role: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl NewMessage {
    pub fn new(
        thread_id: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let thread_id = thread_id.into();
        let mut metadata = Map::new();
        metadata.insert("thread_id".to_owned(), Value::String(thread_id.clone()));
        Self {
            thread_id,
            sender: sender.into(),
            recipient: recipient.into(),
            role: role.into(),
            content: content.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_owned(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMessage {
    pub id: String,
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub role: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl PersistedMessage {
    pub fn from_new(message: NewMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: message.thread_id,
            sender: message.sender,
            recipient: message.recipient,
            content: message.content,
            role: message.role,
            metadata: message.metadata,
            created_at: Utc::now(),
        }
    }

    pub fn is_team_thread(&self) -> bool {
        self.metadata
            .get(TEAM_THREAD_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
        }
    }
}

/// One tool execution performed by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub agent_id: String,
    pub tool_name: String,
    pub input: Value,
    pub output: Value,
    pub status: ActionStatus,
}

impl ActionLog {
    /// Derives the status from the tool result shape.
    pub fn from_result(agent_id: &str, tool_name: &str, input: Value, output: Value) -> Self {
        let status = if output.get("error").is_some() {
            ActionStatus::Error
        } else {
            ActionStatus::Success
        };
        Self {
            agent_id: agent_id.to_owned(),
            tool_name: tool_name.to_owned(),
            input,
            output,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub agent_id: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
