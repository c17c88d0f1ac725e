//! Integration tests for the LLM gateway's public surface

use ragdoll_core::{system_message, user_message, EmbeddingResponse, GenerationResponse, LlmConfig, LlmGateway, Role};

fn test_llm_config() -> LlmConfig {
    let mut config = LlmConfig::default();
    // Force the deterministic fallback provider so these tests never
    // require network access or a running provider.
    config.default_provider = "nonexistent-provider".to_string();
    config
}

#[test]
fn test_message_serialization() {
    let message = ragdoll_core::Message { role: Role::User, content: "Hello, world!".to_string() };

    let json = serde_json::to_string(&message).unwrap();
    let deserialized: ragdoll_core::Message = serde_json::from_str(&json).unwrap();

    assert_eq!(message.role, deserialized.role);
    assert_eq!(message.content, deserialized.content);
}

#[test]
fn test_role_lowercase_serialization() {
    assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
}

#[tokio::test]
async fn test_gateway_embed_falls_back_when_provider_unreachable() {
    let gateway = LlmGateway::new(&test_llm_config()).unwrap();
    let result = gateway.embed("hello world").await.unwrap();
    assert_eq!(result.model, "fallback-deterministic");
    assert_eq!(result.embedding.len(), test_llm_config().embedding_dimension);
}

#[tokio::test]
async fn test_gateway_generate_falls_back_when_provider_unreachable() {
    let gateway = LlmGateway::new(&test_llm_config()).unwrap();
    let messages = vec![system_message("You are helpful."), user_message("Hello!")];
    let response = gateway.generate(&messages).await.unwrap();
    assert!(!response.text.is_empty());
}

#[test]
fn test_generation_response_structure() {
    let response = GenerationResponse {
        text: "Test response".to_string(),
        tokens_used: Some(42),
        model: "llama3.2".to_string(),
        finish_reason: Some("stop".to_string()),
    };

    assert_eq!(response.text, "Test response");
    assert_eq!(response.tokens_used, Some(42));
}

#[test]
fn test_embedding_response_structure() {
    let embedding = vec![0.1, 0.2, 0.3];
    let response = EmbeddingResponse { embedding: embedding.clone(), model: "nomic-embed-text".to_string() };

    assert_eq!(response.embedding, embedding);
    assert_eq!(response.model, "nomic-embed-text");
}

mod helper_functions {
    use super::*;

    #[test]
    fn test_system_message_creation() {
        let msg = system_message("You are helpful");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "You are helpful");
    }

    #[test]
    fn test_user_message_creation() {
        let msg = user_message("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }
}
