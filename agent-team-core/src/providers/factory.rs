use std::sync::Arc;

use crate::config::schema::{Config, ProviderConfig, ProviderType};
use crate::error::{Error, Result};
use crate::providers::openai::OpenAiProvider;
use crate::providers::registry::ProviderRegistry;
use crate::providers::types::ModelProvider;

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub fn create_provider_registry(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::default();

    for provider in &config.providers {
        let instance = create_provider(provider)?;
        registry.register(provider.name.clone(), instance);
    }

    Ok(registry)
}

pub fn create_provider(provider: &ProviderConfig) -> Result<Arc<dyn ModelProvider>> {
    match provider.provider_type {
        ProviderType::OpenAi => build_openai_provider(provider),
    }
}

fn build_openai_provider(provider: &ProviderConfig) -> Result<Arc<dyn ModelProvider>> {
    let api_key_env = provider
        .api_key_env
        .as_deref()
        .unwrap_or(DEFAULT_API_KEY_ENV);

    let api_key = std::env::var(api_key_env).map_err(|_| {
        Error::Provider(format!(
            "provider '{}' requires env var '{}' to be set",
            provider.name, api_key_env
        ))
    })?;

    Ok(Arc::new(OpenAiProvider::from_config(provider, &api_key)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_env_is_reported_by_name() {
        let provider = ProviderConfig {
            name: "openai".to_owned(),
            api_key_env: Some("AGENT_TEAM_TEST_KEY_THAT_IS_NEVER_SET".to_owned()),
            ..ProviderConfig::default()
        };

        let error = create_provider(&provider)
            .err()
            .expect("provider creation should fail without the key");
        assert!(error
            .to_string()
            .contains("requires env var 'AGENT_TEAM_TEST_KEY_THAT_IS_NEVER_SET'"));
    }
}
