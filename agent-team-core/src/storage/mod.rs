pub mod factory;
pub mod memory;
pub mod model;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::model::{ActionLog, ConversationSummary, NewMessage, PersistedMessage};

pub use factory::create_message_store;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Append-only persistence for threads, tool actions and session summaries.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, message: NewMessage) -> Result<PersistedMessage>;

    /// Messages most recent first, optionally restricted to one thread.
    async fn get_messages(
        &self,
        thread_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersistedMessage>>;

    async fn log_action(&self, action: ActionLog) -> Result<String>;

    async fn log_conversation(&self, agent_id: &str, summary: &str) -> Result<String>;

    async fn recent_summaries(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>>;

    async fn close(&self) {}
}
