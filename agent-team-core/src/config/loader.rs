use std::path::Path;

use crate::config::schema::Config;
use crate::error::{Error, Result};

pub const WORKSPACE_ENV: &str = "WORKSPACE_PATH";
pub const DATABASE_ENV: &str = "AGENT_TEAM_DATABASE";

pub fn load_from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config '{}': {err}", path.display()))
    })?;

    load_from_str(&content).map_err(|err| match err {
        Error::Config(message) => {
            Error::Config(format!("failed to parse config '{}': {message}", path.display()))
        }
        other => other,
    })
}

pub fn load_from_str(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|err| Error::Config(err.to_string()))
}

/// Applies environment overrides on top of a parsed config.
pub fn load_from_env(mut config: Config) -> Config {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Loads the file when given (or falls back to defaults) and applies
/// environment overrides.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => load_from_file(path)?,
        None => Config::default(),
    };
    Ok(load_from_env(config))
}

fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(workspace) = lookup(WORKSPACE_ENV).filter(|value| !value.trim().is_empty()) {
        config.workspace.path = workspace;
    }
    if let Some(database) = lookup(DATABASE_ENV).filter(|value| !value.trim().is_empty()) {
        config.storage.database_path = database;
    }
}
