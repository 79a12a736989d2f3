use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::model::{ActionLog, ConversationSummary, NewMessage, PersistedMessage};
use crate::storage::MessageStore;

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    messages: RwLock<Vec<PersistedMessage>>,
    actions: RwLock<Vec<(String, ActionLog)>>,
    summaries: RwLock<Vec<ConversationSummary>>,
}

impl InMemoryStore {
    pub async fn actions(&self) -> Vec<ActionLog> {
        self.actions
            .read()
            .await
            .iter()
            .map(|(_, action)| action.clone())
            .collect()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn save_message(&self, message: NewMessage) -> Result<PersistedMessage> {
        let persisted = PersistedMessage::from_new(message);
        self.messages.write().await.push(persisted.clone());
        Ok(persisted)
    }

    async fn get_messages(
        &self,
        thread_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersistedMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .rev()
            .filter(|message| thread_id.map_or(true, |id| message.thread_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn log_action(&self, action: ActionLog) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.actions.write().await.push((id.clone(), action));
        Ok(id)
    }

    async fn log_conversation(&self, agent_id: &str, summary: &str) -> Result<String> {
        let entry = ConversationSummary {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.to_owned(),
            summary: summary.to_owned(),
            created_at: Utc::now(),
        };
        let id = entry.id.clone();
        self.summaries.write().await.push(entry);
        Ok(id)
    }

    async fn recent_summaries(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>> {
        let summaries = self.summaries.read().await;
        Ok(summaries
            .iter()
            .rev()
            .filter(|summary| summary.agent_id == agent_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
