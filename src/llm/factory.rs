// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider factory for creating LLM providers
//!
//! Maps a model spec and the `providers` config section to a concrete
//! provider.

use std::sync::Arc;

use crate::config::{BedrockConfig, EndpointConfig, ProvidersConfig};
use crate::error::{PalaverError, Result};
use crate::llm::model_spec::{ModelSpec, ProviderKind};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::{AnthropicProvider, BedrockProvider, OpenAiProvider};

/// Factory for creating LLM providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider serving `spec`.
    ///
    /// A missing credential is a user error naming the variable to set.
    pub fn create(spec: &ModelSpec, providers: &ProvidersConfig) -> Result<Arc<dyn LlmProvider>> {
        tracing::debug!(provider = %spec.provider, model = %spec.model_id, "Creating provider");
        match spec.provider {
            ProviderKind::Bedrock => Self::create_bedrock(&providers.bedrock),
            ProviderKind::OpenAi => Self::create_openai(&providers.openai),
            ProviderKind::Anthropic => Self::create_anthropic(&providers.anthropic),
            ProviderKind::LiteLlm => Ok(Self::create_litellm(&providers.litellm)),
        }
    }

    /// Create a Bedrock provider
    pub fn create_bedrock(config: &BedrockConfig) -> Result<Arc<dyn LlmProvider>> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| missing_key("Bedrock", &config.api_key_env))?;

        Ok(Arc::new(BedrockProvider::with_base_url(
            api_key,
            config.effective_base_url(),
        )))
    }

    /// Create an OpenAI provider
    pub fn create_openai(config: &EndpointConfig) -> Result<Arc<dyn LlmProvider>> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| missing_key("OpenAI", &config.api_key_env))?;

        Ok(Arc::new(OpenAiProvider::with_base_url(
            Some(api_key),
            &config.base_url,
        )))
    }

    /// Create an Anthropic provider
    pub fn create_anthropic(config: &EndpointConfig) -> Result<Arc<dyn LlmProvider>> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| missing_key("Anthropic", &config.api_key_env))?;

        Ok(Arc::new(AnthropicProvider::with_base_url(
            api_key,
            &config.base_url,
        )))
    }

    /// Create a LiteLLM provider; the proxy may run without a key
    pub fn create_litellm(config: &EndpointConfig) -> Arc<dyn LlmProvider> {
        Arc::new(
            OpenAiProvider::with_base_url(config.resolve_api_key(), &config.base_url)
                .with_name("litellm"),
        )
    }

    /// Check if a provider has the credentials it needs
    pub fn is_configured(provider: ProviderKind, providers: &ProvidersConfig) -> bool {
        match provider {
            ProviderKind::Bedrock => providers.bedrock.resolve_api_key().is_some(),
            ProviderKind::OpenAi => providers.openai.resolve_api_key().is_some(),
            ProviderKind::Anthropic => providers.anthropic.resolve_api_key().is_some(),
            ProviderKind::LiteLlm => true,
        }
    }
}

fn missing_key(provider: &str, env_var: &str) -> PalaverError {
    PalaverError::Config(format!(
        "No {} API key found. Set the {} environment variable or providers.*.api_key in the config file.",
        provider, env_var
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_keys() -> ProvidersConfig {
        let mut providers = ProvidersConfig::default();
        providers.bedrock.api_key_env = "PALAVER_TEST_NONEXISTENT_FACTORY_1".to_string();
        providers.openai.api_key_env = "PALAVER_TEST_NONEXISTENT_FACTORY_2".to_string();
        providers.anthropic.api_key_env = "PALAVER_TEST_NONEXISTENT_FACTORY_3".to_string();
        providers.litellm.api_key_env = "PALAVER_TEST_NONEXISTENT_FACTORY_4".to_string();
        providers
    }

    #[test]
    fn test_missing_key_names_env_var() {
        let providers = without_keys();
        let spec = ModelSpec::parse("openai:gpt-4o").unwrap();
        let err = ProviderFactory::create(&spec, &providers).err().unwrap();
        assert!(err.to_string().contains("PALAVER_TEST_NONEXISTENT_FACTORY_2"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_bedrock_requires_key() {
        let providers = without_keys();
        let spec = ModelSpec::parse("anthropic.claude-3-haiku-20240307-v1:0").unwrap();
        assert!(ProviderFactory::create(&spec, &providers).is_err());
        assert!(!ProviderFactory::is_configured(ProviderKind::Bedrock, &providers));
    }

    #[test]
    fn test_config_key_used() {
        let mut providers = without_keys();
        providers.anthropic.api_key = Some("sk-ant-test".to_string());
        let spec = ModelSpec::parse("anthropic:claude-sonnet-4-20250514").unwrap();
        let provider = ProviderFactory::create(&spec, &providers).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_litellm_without_key() {
        let providers = without_keys();
        let spec = ModelSpec::parse("litellm:llama3").unwrap();
        let provider = ProviderFactory::create(&spec, &providers).unwrap();
        assert_eq!(provider.name(), "litellm");
        assert!(ProviderFactory::is_configured(ProviderKind::LiteLlm, &providers));
    }
}
