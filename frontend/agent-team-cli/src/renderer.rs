use agent_team_core::{AgentInfo, PersistedMessage};
use serde::Serialize;

use crate::cli::OutputFormat;

const OUTPUT_SCHEMA: &str = "agent-team-cli/output/v1";

#[derive(Debug, Serialize)]
struct CliJsonEnvelope<'a, T: Serialize> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    data: &'a T,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorEnvelope<'a> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    error: CliJsonErrorPayload,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorPayload {
    code: &'static str,
    message: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    pub fn format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn agents(&self, agents: &[AgentInfo]) -> agent_team_core::Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                if agents.is_empty() {
                    println!("No agents configured.");
                }
                for agent in agents {
                    println!("- {} ({})", agent.name, agent.role);
                    if !agent.description.is_empty() {
                        println!("  description: {}", agent.description.trim());
                    }
                    println!("  tools: {}", agent.tools.join(", "));
                }
                Ok(())
            }
            OutputFormat::Json => print_json_envelope("agents", &agents),
        }
    }

    pub fn reply(&self, reply: &PersistedMessage) -> agent_team_core::Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                println!("[{}] {}", reply.sender, reply.content);
                Ok(())
            }
            OutputFormat::Json => print_json_envelope("send", reply),
        }
    }

    pub fn history(&self, messages: &[PersistedMessage]) -> agent_team_core::Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                if messages.is_empty() {
                    println!("No messages stored.");
                }
                for message in messages {
                    println!(
                        "{} [{}] {} -> {}: {}",
                        message.created_at.format("%Y-%m-%d %H:%M:%S"),
                        message.thread_id,
                        message.sender,
                        message.recipient,
                        message.content
                    );
                }
                Ok(())
            }
            OutputFormat::Json => print_json_envelope("history", &messages),
        }
    }

    pub fn error(&self, command: &str, error: &agent_team_core::Error) {
        match self.output_format {
            OutputFormat::Text => eprintln!("agent-team failed: {error}"),
            OutputFormat::Json => {
                let envelope = CliJsonErrorEnvelope {
                    schema: OUTPUT_SCHEMA,
                    status: "error",
                    command,
                    error: CliJsonErrorPayload {
                        code: error_code(error),
                        message: error.to_string(),
                    },
                };
                match serde_json::to_string(&envelope) {
                    Ok(line) => println!("{line}"),
                    Err(_) => eprintln!("agent-team failed: {error}"),
                }
            }
        }
    }
}

fn print_json_envelope<T: Serialize>(command: &str, data: &T) -> agent_team_core::Result<()> {
    let envelope = CliJsonEnvelope {
        schema: OUTPUT_SCHEMA,
        status: "ok",
        command,
        data,
    };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

fn error_code(error: &agent_team_core::Error) -> &'static str {
    use agent_team_core::Error;

    match error {
        Error::Config(_) => "config_error",
        Error::Validation(_) => "validation_error",
        Error::NotFound(_) => "not_found",
        Error::Schema(_) => "schema_error",
        Error::Provider(_) => "provider_error",
        Error::Tool(_) => "tool_error",
        Error::ToolArguments(_) => "tool_arguments_error",
        Error::Storage(_) => "storage_error",
        Error::Database(_) => "database_error",
        Error::Json(_) => "json_error",
        Error::Io(_) => "io_error",
    }
}
