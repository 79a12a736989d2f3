pub mod behavior;
pub mod registry;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use behavior::Agent;
pub use registry::AgentRegistry;
pub use session::Session;

/// Public description of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub tools: Vec<String>,
}

/// Where a message comes from: the thread it belongs to and the agents
/// already waiting on this call chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContext {
    pub thread_id: Option<String>,
    pub call_chain: Vec<String>,
}

impl MessageContext {
    pub fn on_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            call_chain: Vec::new(),
        }
    }
}

#[async_trait]
pub trait ConversationAgent: Send + Sync {
    fn name(&self) -> &str;

    fn info(&self) -> AgentInfo;

    /// Answers one message. Failures come back as apology text, never as an
    /// error.
    async fn process_message(&self, message: &str, context: MessageContext) -> String;

    /// Stores the current session transcript as a conversation summary.
    async fn log_conversation(&self);
}
