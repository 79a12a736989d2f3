use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub storage: StorageConfig,
    pub team: TeamConfig,
    pub providers: Vec<ProviderConfig>,
    pub agents: Vec<AgentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
            storage: StorageConfig::default(),
            team: TeamConfig::default(),
            providers: Vec::new(),
            agents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory the file tools are confined to.
    pub path: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: "./workspace".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub database_path: String,
    pub connection_string_prefix: String,
    pub pool_size: usize,
    pub sqlite: SqliteStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Sqlite,
            database_path: ".agent-team/messages.db".to_owned(),
            connection_string_prefix: "sqlite://".to_owned(),
            pool_size: 5,
            sqlite: SqliteStorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteStorageConfig {
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            foreign_keys: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Reserved recipient name that routes a user message to the team thread.
    pub team_agent_name: String,
    /// Agent answering messages addressed to the team. Defaults to the first agent.
    pub entry_agent: Option<String>,
    /// Longest inter-agent call chain allowed, counting the agent that started it.
    pub max_call_depth: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            team_agent_name: "Team".to_owned(),
            entry_agent: None,
            max_call_depth: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub provider_type: ProviderType,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider_type: ProviderType::OpenAi,
            model: None,
            api_key_env: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
            request_timeout_secs: 120,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[default]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub agent_id: Option<String>,
    pub role: String,
    pub description: String,
    pub provider: String,
    pub tool_categories: Vec<String>,
    /// Template with `{name}`, `{role}`, `{description}` and `{tools}` placeholders.
    pub system_prompt: Option<String>,
    pub session_mode: SessionMode,
    /// Unset means the loop runs until the model stops calling tools.
    pub max_tool_rounds: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            agent_id: None,
            role: String::new(),
            description: String::new(),
            provider: String::new(),
            tool_categories: vec!["file".to_owned(), "general".to_owned()],
            system_prompt: None,
            session_mode: SessionMode::Persistent,
            max_tool_rounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// The session keeps growing across messages.
    #[default]
    Persistent,
    /// Every message starts from `[system, user]`.
    OneShot,
}
