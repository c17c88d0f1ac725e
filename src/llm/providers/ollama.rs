//! Ollama provider (local inference, no API key required).
//!
//! Ground in the deleted `llm.rs::OllamaClient`: same `/api/chat`,
//! `/api/embeddings`, `/api/tags` endpoints, generalized behind the
//! `LlmProvider` trait instead of the agent-specific `LlmClient`.

use crate::error::{LlmError, Result};
use crate::llm::provider::{LlmProvider, ProviderConfig, ProviderStats, ProviderType};
use crate::llm::{EmbeddingResponse, GenerationResponse, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    message: Message,
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelInfo {
    name: String,
}

/// Ollama provider
pub struct OllamaProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    stats: ProviderStats,
}

impl OllamaProvider {
    pub fn create(config: ProviderConfig) -> Arc<dyn LlmProvider> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .expect("failed to build Ollama HTTP client");

        Arc::new(Self {
            client,
            config,
            stats: ProviderStats::default(),
        })
    }

    pub fn from_env(text_model: String, embedding_model: Option<String>) -> Arc<dyn LlmProvider> {
        let base_url = std::env::var("OLLAMA_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());

        let config = ProviderConfig {
            provider: ProviderType::Ollama,
            name: "ollama".to_string(),
            priority: 0,
            api_key: None,
            base_url: Some(base_url),
            text_model,
            embedding_model,
            max_tokens: 4096,
            temperature: 0.7,
            timeout: 60,
            options: serde_json::Value::Null,
        };

        Self::create(config)
    }

    fn api_url(&self, endpoint: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434");
        format!("{}/api/{}", base.trim_end_matches('/'), endpoint)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn generate(&self, messages: &[Message]) -> Result<GenerationResponse> {
        debug!("Generating with Ollama using {} messages", messages.len());

        let request = OllamaGenerateRequest {
            model: self.config.text_model.clone(),
            messages: messages.to_vec(),
            stream: false,
            options: OllamaOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        let url = self.api_url("chat");
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout)?
        .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!("Ollama API error: {}", error_text);
            return Err(LlmError::GenerationFailed(error_text).into());
        }

        let ollama_response: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if !ollama_response.done {
            return Err(LlmError::InvalidResponse("incomplete response".to_string()).into());
        }

        info!("Generated {} tokens", ollama_response.eval_count.unwrap_or(0));

        Ok(GenerationResponse {
            text: ollama_response.message.content,
            tokens_used: ollama_response.eval_count,
            model: ollama_response.model,
            finish_reason: ollama_response.done_reason,
        })
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingResponse> {
        let embedding_model = self.config.embedding_model.as_ref().ok_or_else(|| {
            LlmError::EmbeddingFailed("no embedding model configured for ollama".to_string())
        })?;

        let request = OllamaEmbedRequest {
            model: embedding_model.clone(),
            prompt: text.to_string(),
        };

        let url = self.api_url("embeddings");
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout)?
        .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::EmbeddingFailed(error_text).into());
        }

        let ollama_response: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(EmbeddingResponse {
            embedding: ollama_response.embedding,
            model: embedding_model.clone(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.api_url("tags");
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout)?
        .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::GenerationFailed(error_text).into());
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    async fn is_model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == model))
    }

    fn get_stats(&self) -> ProviderStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_default() {
        let provider = OllamaProvider::from_env("llama3.2".to_string(), None);
        assert_eq!(provider.name(), "ollama");
    }
}
