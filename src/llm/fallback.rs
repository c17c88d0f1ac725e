//! Synthetic zero-credential last-resort provider (spec.md §4.3, degraded
//! mode). Installed as the final fallback in every `ProviderManager` chain
//! so the existing retry-then-fallback loop (grounded in `llm/manager.rs`)
//! naturally lands here when every configured provider is unavailable or
//! unconfigured.

use crate::error::Result;
use crate::llm::provider::{LlmProvider, ProviderStats, ProviderType};
use crate::llm::{
    EmbeddingResponse, GenerationResponse, Message, Role, EXTRACT_KEYWORDS_MARKER, METADATA_MARKER,
    SUMMARIZE_MARKER,
};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Deterministic, offline provider used when no real backend is reachable.
pub struct FallbackProvider {
    embedding_dimension: usize,
}

impl FallbackProvider {
    pub fn new(embedding_dimension: usize) -> Self {
        Self { embedding_dimension }
    }

    fn summarize(text: &str) -> String {
        let sentences: Vec<&str> = text
            .split(|c| c == '.' || c == '!' || c == '?')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        let take = (sentences.len() / 4).max(1).min(sentences.len());
        sentences[..take].join(". ") + if take > 0 { "." } else { "" }
    }

    fn extract_keywords(text: &str) -> String {
        const STOPWORDS: &[&str] = &[
            "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "for", "is", "are",
            "was", "were", "it", "this", "that", "with", "as", "by", "at", "from", "be", "has",
            "have", "had",
        ];

        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in text.split_whitespace() {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if cleaned.len() < 3 || STOPWORDS.contains(&cleaned.as_str()) {
                continue;
            }
            *counts.entry(cleaned).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(10)
            .map(|(word, _)| word)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Degraded-mode metadata: a real `summary`/`keywords` derived from the
    /// same deterministic summarizer/extractor used for the dedicated
    /// markers, plus a `classification` of `"other"` (always a valid enum
    /// value in every schema) so a document processed with zero provider
    /// credentials still ends up with non-empty required metadata fields
    /// (spec.md §8 "with no provider credential ... `metadata.summary` is
    /// non-empty").
    fn metadata_json(text: &str) -> String {
        let summary = Self::summarize(text);
        let keywords: Vec<String> = Self::extract_keywords(text)
            .split(", ")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        serde_json::json!({
            "summary": summary,
            "classification": "other",
            "keywords": keywords,
        })
        .to_string()
    }
}

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Fallback
    }

    fn name(&self) -> &str {
        "fallback"
    }

    async fn generate(&self, messages: &[Message]) -> Result<GenerationResponse> {
        let system_marker = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let user_content = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let text = if system_marker.starts_with(SUMMARIZE_MARKER) {
            Self::summarize(user_content)
        } else if system_marker.starts_with(EXTRACT_KEYWORDS_MARKER) {
            Self::extract_keywords(user_content)
        } else if system_marker.starts_with(METADATA_MARKER) {
            Self::metadata_json(user_content)
        } else {
            format!(
                "[degraded mode: no LLM provider configured] {}",
                user_content.chars().take(200).collect::<String>()
            )
        };

        Ok(GenerationResponse {
            text,
            tokens_used: None,
            model: "fallback-deterministic".to_string(),
            finish_reason: Some("fallback".to_string()),
        })
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingResponse> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut state = seed;
        let mut embedding = Vec::with_capacity(self.embedding_dimension);
        for _ in 0..self.embedding_dimension {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let value = (state as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in embedding.iter_mut() {
                *v /= norm;
            }
        }

        Ok(EmbeddingResponse {
            embedding,
            model: "fallback-deterministic".to_string(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["fallback-deterministic".to_string()])
    }

    async fn is_model_available(&self, _model: &str) -> Result<bool> {
        Ok(true)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn get_stats(&self) -> ProviderStats {
        ProviderStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let provider = FallbackProvider::new(8);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a.embedding, b.embedding);
        assert_eq!(a.embedding.len(), 8);
    }

    #[tokio::test]
    async fn test_embed_differs_by_input() {
        let provider = FallbackProvider::new(8);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("goodbye").await.unwrap();
        assert_ne!(a.embedding, b.embedding);
    }

    #[tokio::test]
    async fn test_summarize_marker_triggers_summarizer() {
        let provider = FallbackProvider::new(4);
        let messages = vec![
            Message {
                role: Role::System,
                content: SUMMARIZE_MARKER.to_string(),
            },
            Message {
                role: Role::User,
                content: "First sentence. Second sentence. Third sentence. Fourth sentence."
                    .to_string(),
            },
        ];
        let response = provider.generate(&messages).await.unwrap();
        assert!(response.text.contains("First sentence"));
        assert!(!response.text.contains("Fourth sentence"));
    }

    #[tokio::test]
    async fn test_keyword_marker_triggers_extractor() {
        let provider = FallbackProvider::new(4);
        let messages = vec![
            Message {
                role: Role::System,
                content: EXTRACT_KEYWORDS_MARKER.to_string(),
            },
            Message {
                role: Role::User,
                content: "rust rust rust async programming async".to_string(),
            },
        ];
        let response = provider.generate(&messages).await.unwrap();
        assert!(response.text.starts_with("rust"));
    }

    #[tokio::test]
    async fn test_metadata_marker_produces_valid_json_with_nonempty_summary() {
        let provider = FallbackProvider::new(4);
        let messages = vec![
            Message {
                role: Role::System,
                content: format!(
                    "{METADATA_MARKER} Respond with a single JSON object containing exactly the requested fields, nothing else."
                ),
            },
            Message {
                role: Role::User,
                content: "First sentence. Second sentence. Third sentence. Fourth sentence."
                    .to_string(),
            },
        ];
        let response = provider.generate(&messages).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&response.text).unwrap();
        assert!(!value["summary"].as_str().unwrap().is_empty());
        assert_eq!(value["classification"], "other");
        assert!(value["keywords"].is_array());
    }
}
