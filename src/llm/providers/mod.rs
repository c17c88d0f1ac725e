//! LLM Provider Implementations
//!
//! This module contains concrete implementations for various LLM providers.

pub mod anthropic;
pub mod base;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod openai_compatible;
pub mod openai_variants;

// Re-export commonly used types
pub use anthropic::AnthropicProvider;
pub use base::{HttpProviderClient, OpenAICompatible};
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use openai_variants::{AzureOpenAIProvider, GroqProvider, TogetherProvider};
