//! OpenAI provider

use crate::llm::provider::{LlmProvider, ProviderConfig, ProviderType};
use crate::llm::providers::base::OpenAICompatible;
use crate::llm::providers::openai_compatible::OpenAICompatibleProvider;
use std::sync::Arc;

/// OpenAI adapter
pub struct OpenAIAdapter {
    base_url: String,
    api_key: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self { base_url, api_key }
    }
}

impl OpenAICompatible for OpenAIAdapter {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// OpenAI provider
pub type OpenAIProvider = OpenAICompatibleProvider<OpenAIAdapter>;

impl OpenAIProvider {
    pub fn create(config: ProviderConfig) -> Arc<dyn LlmProvider> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let adapter = OpenAIAdapter::new(base_url, config.api_key.clone());
        Arc::new(OpenAICompatibleProvider::new(adapter, config))
    }

    pub fn from_env(
        text_model: String,
        embedding_model: Option<String>,
    ) -> std::result::Result<Arc<dyn LlmProvider>, String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY environment variable not set")?;

        let config = ProviderConfig {
            provider: ProviderType::OpenAI,
            name: "openai".to_string(),
            priority: 10,
            api_key: Some(api_key),
            base_url: Some("https://api.openai.com/v1".to_string()),
            text_model,
            embedding_model: Some(embedding_model.unwrap_or_else(|| "text-embedding-3-small".to_string())),
            max_tokens: 4096,
            temperature: 0.7,
            timeout: 60,
            options: serde_json::Value::Null,
        };

        Ok(Self::create(config))
    }
}
