//! Configuration management for the RAG core

use crate::cache::LlmCacheConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration for the RAG core (C1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Storage layer configuration
    pub storage: StorageConfig,

    /// Chunking parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Search engine parameters
    #[serde(default)]
    pub search: SearchConfig,

    /// Metadata generation parameters
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Job runner parameters
    #[serde(default)]
    pub jobs: JobConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the default provider, e.g. "ollama", "openai", "anthropic".
    pub default_provider: String,

    /// Per-task overrides expressed as `"provider/model"`, e.g.
    /// `{"summarize": "anthropic/claude-3-haiku-20240307"}`.
    #[serde(default)]
    pub task_models: HashMap<String, String>,

    /// Credential/endpoint shape for every supported provider.
    #[serde(default)]
    pub providers: HashMap<String, ProviderCredentials>,

    /// Default text model for generation.
    pub text_model: String,

    /// Default model for embeddings.
    pub embedding_model: String,

    /// Embedding dimension produced by `embedding_model`.
    pub embedding_dimension: usize,

    /// Maximum tokens for generation.
    pub max_tokens: u32,

    /// Temperature for generation.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout: u64,

    /// Minimum content length before `summarize` does any work.
    #[serde(default = "default_summary_min_content_length")]
    pub summary_min_content_length: usize,

    /// Maximum length of a generated summary.
    #[serde(default = "default_summary_max_length")]
    pub summary_max_length: usize,

    /// Disables summarization outright (degraded mode always used).
    #[serde(default)]
    pub summarization_disabled: bool,

    /// LLM response cache configuration
    #[serde(default)]
    pub cache: LlmCacheConfig,

    /// Fallback/retry policy
    #[serde(default)]
    pub fallback: FallbackConfig,
}

fn default_summary_min_content_length() -> usize {
    200
}

fn default_summary_max_length() -> usize {
    500
}

/// Declared credential shape for one provider entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub deployment_name: Option<String>,
    pub api_version: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    10
}

/// Fallback/retry behavior for the LLM gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Storage layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store kind: "sqlite" or "memory".
    pub store_type: String,

    /// Database URL/path (for SQLite).
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_type: "sqlite".to_string(),
            database_url: Some("sqlite:ragdoll.db".to_string()),
        }
    }
}

/// Chunking parameters (spec.md §4.2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default)]
    pub max_chunks: Option<usize>,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_chunks: None,
        }
    }
}

/// Search engine parameters (spec.md §4.6)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_search_results")]
    pub max_results: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    #[serde(default = "default_text_weight")]
    pub text_weight: f32,
}

fn default_max_search_results() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_text_weight() -> f32 {
    0.3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_search_results(),
            similarity_threshold: default_similarity_threshold(),
            semantic_weight: default_semantic_weight(),
            text_weight: default_text_weight(),
        }
    }
}

/// Metadata generation parameters (spec.md §4.4)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_content_preview_chars")]
    pub content_preview_chars: usize,
}

fn default_content_preview_chars() -> usize {
    2000
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            content_preview_chars: default_content_preview_chars(),
        }
    }
}

/// Job runner parameters (spec.md §4.5)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Maximum number of documents processed concurrently.
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,
}

fn default_max_concurrent_documents() -> usize {
    4
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: default_max_concurrent_documents(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Severity filter, one of debug/info/warn/error/fatal.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file path; stderr is used when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: "ollama".to_string(),
            task_models: HashMap::new(),
            providers: HashMap::new(),
            text_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimension: 768,
            max_tokens: 4096,
            temperature: 0.7,
            timeout: 30,
            summary_min_content_length: default_summary_min_content_length(),
            summary_max_length: default_summary_max_length(),
            summarization_disabled: false,
            cache: LlmCacheConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Resolve the `"provider/model"` override for a task, falling back to
    /// the default provider and text model when no override is declared.
    pub fn resolve_task_model(&self, task: &str) -> (String, String) {
        if let Some(spec) = self.task_models.get(task) {
            if let Some((provider, model)) = spec.split_once('/') {
                return (provider.to_string(), model.to_string());
            }
        }
        (self.default_provider.clone(), self.text_model.clone())
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            storage: StorageConfig::default(),
            chunking: ChunkingConfig::default(),
            search: SearchConfig::default(),
            metadata: MetadataConfig::default(),
            jobs: JobConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RagConfig {
    /// Load configuration from a file; dispatch on extension.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("Unsupported config file format")),
        };
        Ok(config)
    }

    /// Save configuration to a file; dispatch on extension.
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string(self)?,
            Some("yaml") | Some("yml") => serde_yml::to_string(self)?,
            _ => return Err(anyhow::anyhow!("Unsupported config file format")),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay recognized environment variables onto this configuration
    /// (spec.md §6). Only credentials present in the environment override
    /// the existing (possibly absent) values; everything else is untouched.
    pub fn from_env_overlay(mut self) -> Self {
        let env_keys = [
            ("openai", "OPENAI_API_KEY"),
            ("anthropic", "ANTHROPIC_API_KEY"),
            ("google", "GOOGLE_API_KEY"),
            ("azure", "AZURE_OPENAI_API_KEY"),
            ("huggingface", "HUGGINGFACE_API_KEY"),
            ("openrouter", "OPENROUTER_API_KEY"),
        ];
        for (provider, var) in env_keys {
            if let Ok(key) = std::env::var(var) {
                let entry = self.llm.providers.entry(provider.to_string()).or_default();
                entry.api_key = Some(key);
            }
        }
        if let Ok(endpoint) = std::env::var("OLLAMA_ENDPOINT") {
            let entry = self.llm.providers.entry("ollama".to_string()).or_default();
            entry.base_url = Some(endpoint);
        }
        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            self.storage.database_url = Some(db_url);
        }
        self
    }

    /// Validate the configuration (spec.md §1/§7 ConfigurationError source).
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.text_model.is_empty() {
            return Err(anyhow::anyhow!("Text model name cannot be empty"));
        }

        if self.llm.embedding_model.is_empty() {
            return Err(anyhow::anyhow!("Embedding model name cannot be empty"));
        }

        if self.llm.embedding_dimension == 0 {
            return Err(anyhow::anyhow!(
                "Embedding dimension must be greater than 0"
            ));
        }

        if self.search.similarity_threshold < 0.0 || self.search.similarity_threshold > 1.0 {
            return Err(anyhow::anyhow!(
                "Similarity threshold must be between 0.0 and 1.0"
            ));
        }

        if self.chunking.chunk_size == 0 {
            return Err(anyhow::anyhow!("Chunk size must be greater than 0"));
        }

        if self.storage.store_type != "sqlite" && self.storage.store_type != "memory" {
            return Err(anyhow::anyhow!(
                "Unsupported store type: {}",
                self.storage.store_type
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RagConfig::default();
        assert!(config.validate().is_ok());

        config.llm.text_model = "".to_string();
        assert!(config.validate().is_err());

        config = RagConfig::default();
        config.search.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_task_model_override() {
        let mut config = RagConfig::default();
        config
            .llm
            .task_models
            .insert("summarize".to_string(), "anthropic/claude-3-haiku".to_string());

        let (provider, model) = config.llm.resolve_task_model("summarize");
        assert_eq!(provider, "anthropic");
        assert_eq!(model, "claude-3-haiku");

        let (provider, model) = config.llm.resolve_task_model("generate_embeddings");
        assert_eq!(provider, config.llm.default_provider);
        assert_eq!(model, config.llm.text_model);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overlay() {
        std::env::set_var("OPENAI_API_KEY", "sk-test-key");
        let config = RagConfig::default().from_env_overlay();
        assert_eq!(
            config.llm.providers.get("openai").and_then(|p| p.api_key.clone()),
            Some("sk-test-key".to_string())
        );
        std::env::remove_var("OPENAI_API_KEY");
    }
}
