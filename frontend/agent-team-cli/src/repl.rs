use std::io::{self, Write};

use agent_team_core::error::Result;
use agent_team_core::AgentTeam;

use crate::cli::OutputFormat;
use crate::renderer::Renderer;

pub struct Repl<'a> {
    app: &'a AgentTeam,
    agent_name: String,
    thread_id: Option<String>,
    renderer: Renderer,
}

impl<'a> Repl<'a> {
    pub fn new(
        app: &'a AgentTeam,
        agent_name: String,
        thread_id: Option<String>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            app,
            agent_name,
            thread_id,
            renderer: Renderer::new(output_format),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let team_name = &self.app.config().team.team_agent_name;
        if self.agent_name != *team_name && !self.app.agents().has_agent(&self.agent_name) {
            return Err(agent_team_core::Error::NotFound(format!(
                "agent '{}'",
                self.agent_name
            )));
        }

        if self.renderer.format() == OutputFormat::Text {
            println!();
            println!("Agent Team chat with {}", self.agent_name);
            println!("Type '/agent <name>' to switch, '/thread' to show the thread, 'exit' to quit");
            println!();
        }

        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }

            let input = input.trim();
            if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                break;
            }
            if input.is_empty() {
                continue;
            }

            if let Some(name) = input.strip_prefix("/agent ") {
                self.agent_name = name.trim().to_owned();
                self.thread_id = None;
                println!("Now talking to {}", self.agent_name);
                continue;
            }
            if input == "/thread" {
                println!("{}", self.thread_id.as_deref().unwrap_or("(new thread)"));
                continue;
            }

            match self
                .app
                .conversations()
                .send_message(input, self.thread_id.as_deref(), &self.agent_name)
                .await
            {
                Ok(reply) => {
                    self.thread_id = Some(reply.thread_id.clone());
                    self.renderer.reply(&reply)?;
                }
                Err(error) => self.renderer.error("chat", &error),
            }
        }

        Ok(())
    }
}
