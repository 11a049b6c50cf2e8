use autobrowse_core::config::{Config, RoleConfig};
use autobrowse_core::{Error, Result};
use std::sync::Arc;

use crate::{Embedder, OpenAIEmbedder, OpenAIProvider, Provider};

/// Build the chat provider for one conversational role.
pub fn create_provider(config: &Config, role: &RoleConfig) -> Result<Arc<dyn Provider>> {
    if config.openai.api_key.is_empty() {
        return Err(Error::Config(
            "No API key configured (set openai.apiKey or OPENAI_API_KEY)".to_string(),
        ));
    }
    Ok(Arc::new(OpenAIProvider::new(
        &config.openai.api_key,
        config.openai.api_base.as_deref(),
        config.role_model(role),
        config.agents.max_tokens,
        config.agents.temperature,
    )))
}

pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    if config.openai.api_key.is_empty() {
        return Err(Error::Config(
            "No API key configured (set openai.apiKey or OPENAI_API_KEY)".to_string(),
        ));
    }
    Ok(Arc::new(OpenAIEmbedder::new(
        &config.openai.api_key,
        config.openai.api_base.as_deref(),
        &config.retrieval.embedding_model,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_requires_api_key() {
        let config = Config::default();
        assert!(create_provider(&config, &config.agents.planner).is_err());
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_create_provider_with_key() {
        let mut config = Config::default();
        config.openai.api_key = "sk-test".to_string();
        assert!(create_provider(&config, &config.agents.planner).is_ok());
        assert!(create_embedder(&config).is_ok());
    }
}
