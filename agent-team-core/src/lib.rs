pub mod agents;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod providers;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tools;

use std::path::Path;
use std::sync::Arc;

pub use agents::{Agent, AgentInfo, AgentRegistry, ConversationAgent, MessageContext};
pub use config::Config;
pub use conversation::{ConversationService, TeamThreads};
pub use error::{Error, Result};
pub use storage::model::PersistedMessage;
pub use storage::MessageStore;

use providers::ProviderRegistry;
use tools::{
    register_file_tools, register_general_tools, MessageAgentTool, ToolBox, ToolRegistry,
    Workspace, GENERAL_CATEGORY, TEAM_CATEGORY,
};

/// A running team: configured agents, their tools and the message store.
pub struct AgentTeam {
    config: Config,
    agents: Arc<AgentRegistry>,
    store: Arc<dyn MessageStore>,
    conversations: ConversationService,
}

impl AgentTeam {
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        let providers = providers::create_provider_registry(&config)?;
        let store = storage::create_message_store(&config)?;
        Self::with_components(config, &providers, store)
    }

    pub fn from_config_path(path: Option<&Path>) -> Result<Self> {
        Self::new(config::load(path)?)
    }

    /// Assembles the team from already-built providers and store.
    pub fn with_components(
        config: Config,
        providers: &ProviderRegistry,
        store: Arc<dyn MessageStore>,
    ) -> Result<Self> {
        config::validate_config(&config)?;

        let workspace = Workspace::open(&config.workspace.path)?;
        let agents = Arc::new(AgentRegistry::new());
        let threads = Arc::new(TeamThreads::new(Arc::clone(&store)));

        let mut tools = ToolRegistry::default();
        register_file_tools(&mut tools, &workspace)?;
        register_general_tools(&mut tools)?;
        tools.register(
            "message_agent",
            Arc::new(MessageAgentTool::new(
                &agents,
                Arc::clone(&threads),
                Arc::clone(&store),
                config.team.max_call_depth,
            )),
            [GENERAL_CATEGORY, TEAM_CATEGORY],
        )?;

        for agent_config in &config.agents {
            let provider = providers.get(&agent_config.provider)?;
            let tool_box = ToolBox::new(&tools, &agent_config.tool_categories);
            let agent = Agent::new(agent_config.clone(), provider, tool_box, Arc::clone(&store));
            agents.register(Arc::new(agent))?;
        }

        tracing::info!(
            agents = agents.len(),
            tools = tools.tool_names().len(),
            workspace = %workspace.root().display(),
            "agent team ready"
        );

        let conversations = ConversationService::new(
            Arc::clone(&agents),
            Arc::clone(&store),
            threads,
            config.team.clone(),
        );

        Ok(Self {
            config,
            agents,
            store,
            conversations,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    /// Flushes every agent's session summary and closes the store.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down agent team");
        self.conversations.log_conversations().await;
        self.store.close().await;
    }
}
