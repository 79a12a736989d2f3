use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "agent-team", about = "Talk to a team of tool-using agents")]
pub struct Cli {
    #[arg(long, env = "AGENT_TEAM_CONFIG", default_value = "agent-team.toml")]
    pub config: String,

    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the configured agents and their tools.
    Agents,
    /// Send one message and print the reply.
    Send {
        /// Agent name, or the team name to reach the team entry agent.
        #[arg(long, default_value = "Developer")]
        agent: String,
        #[arg(long)]
        thread: Option<String>,
        message: String,
    },
    /// Interactive conversation with one agent.
    Chat {
        #[arg(long, default_value = "Developer")]
        agent: String,
        #[arg(long)]
        thread: Option<String>,
    },
    /// Show stored messages, most recent first.
    History {
        #[arg(long)]
        thread: Option<String>,
        #[arg(long, default_value_t = agent_team_core::conversation::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Load and validate the configuration without starting agents.
    ValidateConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
