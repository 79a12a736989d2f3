use std::sync::{Arc, PoisonError, RwLock};

use crate::agents::{AgentInfo, ConversationAgent};
use crate::error::{Error, Result};

/// Agents by name, in registration order. Populated once at startup.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn ConversationAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Arc<dyn ConversationAgent>) -> Result<()> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.iter().any(|existing| existing.name() == agent.name()) {
            return Err(Error::Validation(format!(
                "agent '{}' is already registered",
                agent.name()
            )));
        }

        tracing::debug!(agent = agent.name(), "registered agent");
        agents.push(agent);
        Ok(())
    }

    pub fn get_agent(&self, name: &str) -> Option<Arc<dyn ConversationAgent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|agent| agent.name() == name)
            .cloned()
    }

    pub fn has_agent(&self, name: &str) -> bool {
        self.get_agent(name).is_some()
    }

    pub fn list_agents(&self) -> Vec<String> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|agent| agent.name().to_owned())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<dyn ConversationAgent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn infos(&self) -> Vec<AgentInfo> {
        self.all().iter().map(|agent| agent.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.list_agents())
            .finish()
    }
}
