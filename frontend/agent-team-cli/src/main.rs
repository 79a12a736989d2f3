mod cli;
mod renderer;
mod repl;

use std::path::Path;

use agent_team_core::AgentTeam;

use crate::cli::{Cli, Command};
use crate::renderer::Renderer;

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Agents => "agents",
        Command::Send { .. } => "send",
        Command::Chat { .. } => "chat",
        Command::History { .. } => "history",
        Command::ValidateConfig => "validate-config",
    }
}

fn config_path(raw: &str) -> Option<&Path> {
    let path = Path::new(raw);
    path.exists().then_some(path)
}

async fn execute(app: &AgentTeam, command: Command, renderer: Renderer) -> agent_team_core::Result<()> {
    match command {
        Command::Agents => renderer.agents(&app.conversations().agents()),
        Command::Send {
            agent,
            thread,
            message,
        } => {
            let reply = app
                .conversations()
                .send_message(&message, thread.as_deref(), &agent)
                .await?;
            renderer.reply(&reply)
        }
        Command::Chat { agent, thread } => {
            repl::Repl::new(app, agent, thread, renderer.format())
                .run()
                .await
        }
        Command::History { thread, limit } => {
            let messages = app
                .conversations()
                .get_messages(thread.as_deref(), limit)
                .await?;
            renderer.history(&messages)
        }
        Command::ValidateConfig => Ok(()),
    }
}

fn run(cli: Cli, renderer: Renderer) -> agent_team_core::Result<()> {
    let path = config_path(&cli.config);
    if path.is_none() {
        tracing::warn!(config = %cli.config, "config file not found, using defaults");
    }

    if let Command::ValidateConfig = cli.command {
        let config = agent_team_core::config::load(path)?;
        agent_team_core::config::validate_config(&config)?;
        println!(
            "Configuration OK: {} agent(s), {} provider(s)",
            config.agents.len(),
            config.providers.len()
        );
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let app = AgentTeam::from_config_path(path)?;
        let result = execute(&app, cli.command, renderer).await;
        app.shutdown().await;
        result
    })
}

fn main() {
    let cli = Cli::parse_args();
    agent_team_core::logging::init_tracing(&cli.log_level);

    let renderer = Renderer::new(cli.format);
    let command = command_name(&cli.command);
    if let Err(error) = run(cli, renderer) {
        renderer.error(command, &error);
        std::process::exit(1);
    }
}
