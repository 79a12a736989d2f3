use std::collections::HashSet;

use crate::config::schema::Config;
use crate::error::{Error, Result};

/// Sender and recipient name used for the human side of a thread.
pub const USER_PARTICIPANT: &str = "user";

pub fn validate_config(config: &Config) -> Result<()> {
    if config.providers.is_empty() {
        return Err(Error::Validation(
            "at least one provider must be configured".to_owned(),
        ));
    }

    if config.agents.is_empty() {
        return Err(Error::Validation(
            "at least one agent must be configured".to_owned(),
        ));
    }

    if config.workspace.path.trim().is_empty() {
        return Err(Error::Validation(
            "workspace path cannot be empty".to_owned(),
        ));
    }

    if config.team.max_call_depth == 0 {
        return Err(Error::Validation(
            "team.max_call_depth must be at least 1".to_owned(),
        ));
    }

    let mut provider_names = HashSet::new();
    for provider in &config.providers {
        let name = provider.name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "provider name cannot be empty".to_owned(),
            ));
        }

        if !provider_names.insert(name.to_owned()) {
            return Err(Error::Validation(format!(
                "duplicate provider name '{name}'"
            )));
        }
    }

    let team_name = config.team.team_agent_name.trim();
    let mut agent_names = HashSet::new();
    for agent in &config.agents {
        let name = agent.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("agent name cannot be empty".to_owned()));
        }

        if name.eq_ignore_ascii_case(USER_PARTICIPANT) || name == team_name {
            return Err(Error::Validation(format!(
                "agent name '{name}' is reserved"
            )));
        }

        if !agent_names.insert(name.to_owned()) {
            return Err(Error::Validation(format!("duplicate agent name '{name}'")));
        }

        if !provider_names.contains(agent.provider.trim()) {
            return Err(Error::Validation(format!(
                "agent '{name}' references missing provider '{}'",
                agent.provider
            )));
        }
    }

    if let Some(entry) = config.team.entry_agent.as_deref() {
        if !agent_names.contains(entry.trim()) {
            return Err(Error::Validation(format!(
                "team entry agent '{entry}' is not a configured agent"
            )));
        }
    }

    Ok(())
}
