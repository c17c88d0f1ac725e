//! Provider manager: primary + fallback chain with per-provider retries
//! (spec.md §4.3). The last entry in the fallback chain is, by convention,
//! always a `FallbackProvider`, so this loop never has to special-case
//! "no providers configured" — it just runs out of real providers and
//! lands on the deterministic one.

use crate::error::{LlmError, RagError, Result};
use crate::llm::provider::LlmProvider;
use crate::llm::{EmbeddingResponse, GenerationResponse, Message};
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for provider manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub enable_fallback: bool,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// Provider manager that handles multiple LLM providers with fallback
pub struct ProviderManager {
    primary: Arc<dyn LlmProvider>,
    fallbacks: Vec<Arc<dyn LlmProvider>>,
    config: ManagerConfig,
}

impl ProviderManager {
    pub fn new(primary: Arc<dyn LlmProvider>) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
            config: ManagerConfig::default(),
        }
    }

    pub fn with_fallback(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.fallbacks.push(provider);
        self
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    async fn try_generate_with_retries(
        &self,
        provider: &Arc<dyn LlmProvider>,
        messages: &[Message],
        provider_name: &str,
    ) -> Result<GenerationResponse> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            match provider.generate(messages).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!("generated after {} retries with {}", attempt, provider_name);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!("attempt {} failed for {}: {}", attempt + 1, provider_name, e);
                    last_error = Some(e);
                    if attempt + 1 < self.config.max_retries.max(1) {
                        tokio::time::sleep(tokio::time::Duration::from_millis(
                            self.config.retry_delay_ms,
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RagError::Llm(LlmError::Unknown("no error recorded".to_string()))))
    }

    async fn try_embed_with_retries(
        &self,
        provider: &Arc<dyn LlmProvider>,
        text: &str,
        provider_name: &str,
    ) -> Result<EmbeddingResponse> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            match provider.embed(text).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!("embedded after {} retries with {}", attempt, provider_name);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        "embed attempt {} failed for {}: {}",
                        attempt + 1,
                        provider_name,
                        e
                    );
                    last_error = Some(e);
                    if attempt + 1 < self.config.max_retries.max(1) {
                        tokio::time::sleep(tokio::time::Duration::from_millis(
                            self.config.retry_delay_ms,
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RagError::Llm(LlmError::Unknown("no error recorded".to_string()))))
    }

    pub async fn generate(&self, messages: &[Message]) -> Result<GenerationResponse> {
        match self
            .try_generate_with_retries(&self.primary, messages, "primary")
            .await
        {
            Ok(response) => return Ok(response),
            Err(e) if !self.config.enable_fallback || self.fallbacks.is_empty() => return Err(e),
            Err(e) => warn!("primary provider failed: {}, trying fallbacks", e),
        }

        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let provider_name = format!("fallback_{idx}");
            match self
                .try_generate_with_retries(fallback, messages, &provider_name)
                .await
            {
                Ok(response) => {
                    debug!("used fallback provider {}", idx);
                    return Ok(response);
                }
                Err(e) => warn!("fallback {} failed: {}", idx, e),
            }
        }

        Err(RagError::Llm(LlmError::AllProvidersFailed))
    }

    pub async fn embed(&self, text: &str) -> Result<EmbeddingResponse> {
        match self
            .try_embed_with_retries(&self.primary, text, "primary")
            .await
        {
            Ok(response) => return Ok(response),
            Err(e) if !self.config.enable_fallback || self.fallbacks.is_empty() => return Err(e),
            Err(e) => warn!("primary provider embed failed: {}, trying fallbacks", e),
        }

        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let provider_name = format!("fallback_{idx}");
            match self
                .try_embed_with_retries(fallback, text, &provider_name)
                .await
            {
                Ok(response) => {
                    debug!("used fallback provider {} for embedding", idx);
                    return Ok(response);
                }
                Err(e) => warn!("fallback {} embed failed: {}", idx, e),
            }
        }

        Err(RagError::Llm(LlmError::AllProvidersFailed))
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        self.primary.list_models().await
    }

    pub async fn is_model_available(&self, model: &str) -> Result<bool> {
        self.primary.is_model_available(model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fallback::FallbackProvider;

    #[tokio::test]
    async fn test_manager_falls_back_on_primary_failure() {
        struct FailingProvider;

        #[async_trait::async_trait]
        impl LlmProvider for FailingProvider {
            fn provider_type(&self) -> crate::llm::provider::ProviderType {
                crate::llm::provider::ProviderType::Ollama
            }
            fn name(&self) -> &str {
                "failing"
            }
            async fn generate(&self, _messages: &[Message]) -> Result<GenerationResponse> {
                Err(RagError::Llm(LlmError::ConnectionFailed("down".to_string())))
            }
            async fn embed(&self, _text: &str) -> Result<EmbeddingResponse> {
                Err(RagError::Llm(LlmError::ConnectionFailed("down".to_string())))
            }
            async fn list_models(&self) -> Result<Vec<String>> {
                Ok(vec![])
            }
            async fn is_model_available(&self, _model: &str) -> Result<bool> {
                Ok(false)
            }
        }

        let manager = ProviderManager::new(Arc::new(FailingProvider))
            .with_fallback(Arc::new(FallbackProvider::new(4)))
            .with_config(ManagerConfig {
                enable_fallback: true,
                max_retries: 1,
                retry_delay_ms: 0,
            });

        let result = manager.embed("hello").await.unwrap();
        assert_eq!(result.model, "fallback-deterministic");
    }
}
