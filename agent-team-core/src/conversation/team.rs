use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::USER_PARTICIPANT;
use crate::storage::model::PersistedMessage;
use crate::storage::MessageStore;

/// How many stored messages are inspected when looking for a team thread.
pub const TEAM_THREAD_SCAN_LIMIT: usize = 1000;

/// Tracks the single active team thread. The first resolution seeds it from
/// the store; later ones return the same id.
pub struct TeamThreads {
    store: Arc<dyn MessageStore>,
    active: Mutex<Option<String>>,
}

impl TeamThreads {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            active: Mutex::new(None),
        }
    }

    pub async fn resolve(&self) -> String {
        let mut active = self.active.lock().await;
        if let Some(thread_id) = active.as_ref() {
            return thread_id.clone();
        }

        let thread_id = match self.store.get_messages(None, TEAM_THREAD_SCAN_LIMIT).await {
            Ok(messages) => messages.iter().find(|m| is_team_message(m)).map(|m| m.thread_id.clone()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to scan messages for a team thread");
                None
            }
        };

        let thread_id = match thread_id {
            Some(existing) => {
                tracing::debug!(thread_id = %existing, "reusing stored team thread");
                existing
            }
            None => {
                let minted = uuid::Uuid::new_v4().to_string();
                tracing::debug!(thread_id = %minted, "starting new team thread");
                minted
            }
        };

        *active = Some(thread_id.clone());
        thread_id
    }

    pub async fn active(&self) -> Option<String> {
        self.active.lock().await.clone()
    }
}

fn is_team_message(message: &PersistedMessage) -> bool {
    message.is_team_thread()
        || (message.sender != USER_PARTICIPANT && message.recipient != USER_PARTICIPANT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::model::{NewMessage, TEAM_THREAD_FLAG};
    use crate::storage::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn mints_one_thread_and_keeps_reusing_it() {
        let threads = TeamThreads::new(Arc::new(InMemoryStore::default()));
        assert!(threads.active().await.is_none());

        let first = threads.resolve().await;
        let second = threads.resolve().await;
        assert_eq!(first, second);
        assert_eq!(threads.active().await, Some(first));
    }

    #[tokio::test]
    async fn reuses_most_recent_team_thread_from_store() {
        let store = Arc::new(InMemoryStore::default());
        store
            .save_message(
                NewMessage::new("old-team", "Developer", "Critic", "assistant", "old")
                    .with_metadata(TEAM_THREAD_FLAG, json!(true)),
            )
            .await
            .expect("save old");
        store
            .save_message(NewMessage::new("new-team", "Critic", "Developer", "assistant", "new"))
            .await
            .expect("save new");
        store
            .save_message(NewMessage::new("solo", "user", "Developer", "user", "hi"))
            .await
            .expect("save solo");

        let threads = TeamThreads::new(store);
        assert_eq!(threads.resolve().await, "new-team");
    }

    #[tokio::test]
    async fn concurrent_resolution_agrees_on_one_thread() {
        let threads = Arc::new(TeamThreads::new(Arc::new(InMemoryStore::default())));
        let (a, b) = tokio::join!(threads.resolve(), threads.resolve());
        assert_eq!(a, b);
    }
}
