use std::sync::Arc;

use serde_json::json;

use crate::agents::{AgentInfo, AgentRegistry, ConversationAgent, MessageContext};
use crate::config::schema::TeamConfig;
use crate::config::USER_PARTICIPANT;
use crate::conversation::team::TeamThreads;
use crate::error::{Error, Result};
use crate::storage::model::{NewMessage, PersistedMessage, TEAM_THREAD_FLAG};
use crate::storage::MessageStore;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Front door for user conversations with individual agents or the team.
pub struct ConversationService {
    agents: Arc<AgentRegistry>,
    store: Arc<dyn MessageStore>,
    threads: Arc<TeamThreads>,
    team: TeamConfig,
}

struct Route {
    agent: Arc<dyn ConversationAgent>,
    thread_id: String,
    team_thread: bool,
}

impl ConversationService {
    pub fn new(
        agents: Arc<AgentRegistry>,
        store: Arc<dyn MessageStore>,
        threads: Arc<TeamThreads>,
        team: TeamConfig,
    ) -> Self {
        Self {
            agents,
            store,
            threads,
            team,
        }
    }

    async fn route(&self, agent_name: &str, thread_id: Option<&str>) -> Result<Route> {
        if agent_name == self.team.team_agent_name {
            let agent = match self.team.entry_agent.as_deref() {
                Some(entry) => self.agents.get_agent(entry),
                None => self.agents.all().into_iter().next(),
            }
            .ok_or_else(|| Error::NotFound("team entry agent".to_owned()))?;

            let thread_id = match thread_id {
                Some(thread_id) => thread_id.to_owned(),
                None => self.threads.resolve().await,
            };
            return Ok(Route {
                agent,
                thread_id,
                team_thread: true,
            });
        }

        let agent = self
            .agents
            .get_agent(agent_name)
            .ok_or_else(|| Error::NotFound(format!("agent '{agent_name}'")))?;
        Ok(Route {
            agent,
            thread_id: thread_id
                .map(str::to_owned)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            team_thread: false,
        })
    }

    /// Sends `content` to `agent_name` and returns the stored reply. Storing
    /// either side of the exchange is required; a store failure is returned.
    pub async fn send_message(
        &self,
        content: &str,
        thread_id: Option<&str>,
        agent_name: &str,
    ) -> Result<PersistedMessage> {
        let route = self.route(agent_name, thread_id).await?;
        let flag = |message: NewMessage| {
            if route.team_thread {
                message.with_metadata(TEAM_THREAD_FLAG, json!(true))
            } else {
                message
            }
        };

        self.store
            .save_message(flag(NewMessage::new(
                &route.thread_id,
                USER_PARTICIPANT,
                agent_name,
                "user",
                content,
            )))
            .await?;

        let reply = route
            .agent
            .process_message(content, MessageContext::on_thread(&route.thread_id))
            .await;

        let saved = self
            .store
            .save_message(flag(NewMessage::new(
                &route.thread_id,
                route.agent.name(),
                USER_PARTICIPANT,
                "assistant",
                reply,
            )))
            .await?;

        tracing::info!(
            agent = route.agent.name(),
            thread_id = %route.thread_id,
            message_id = %saved.id,
            "reply stored"
        );
        Ok(saved)
    }

    pub async fn get_messages(
        &self,
        thread_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersistedMessage>> {
        self.store.get_messages(thread_id, limit).await
    }

    pub fn agents(&self) -> Vec<AgentInfo> {
        self.agents.infos()
    }

    /// Flushes every agent's session as a conversation summary.
    pub async fn log_conversations(&self) {
        for agent in self.agents.all() {
            agent.log_conversation().await;
        }
    }
}
