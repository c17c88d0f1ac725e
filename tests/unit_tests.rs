//! End-to-end integration tests exercising the full ingestion + retrieval
//! pipeline through the public `RagClient` façade, backed by an in-memory
//! store and the deterministic fallback LLM provider (no network access).

mod test_helpers;

use ragdoll_core::{
    DocumentSource, DocumentStatus, DocumentUpdate, RagClientBuilder, RagConfig, SearchOptions,
};
use test_helpers::{build_memory_client, create_test_config};

#[tokio::test]
async fn test_add_text_produces_processed_document_with_embeddings() {
    let client = build_memory_client().await;
    let result = client
        .add_text(
            "Rust is a systems programming language focused on safety and performance.".to_string(),
            "rust-intro".to_string(),
        )
        .await
        .unwrap();

    assert!(result.success);
    let doc_id = result.document_id.unwrap();
    assert_eq!(client.document_status(doc_id).await.unwrap(), Some(DocumentStatus::Processed));

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert!(stats.total_embeddings >= 1);
}

#[tokio::test]
async fn test_add_document_from_bytes_parses_and_ingests() {
    let client = build_memory_client().await;
    let bytes = b"The quick brown fox jumps over the lazy dog. It is a well-known pangram.".to_vec();
    let result = client
        .add_document(DocumentSource::bytes(bytes, Some("fox.txt".to_string())))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.content_length.unwrap() > 0);
    assert!(result.embeddings_queued);
}

#[tokio::test]
async fn test_search_finds_semantically_relevant_document() {
    let client = build_memory_client().await;
    client
        .add_text("Paris is the capital city of France.".to_string(), "geography".to_string())
        .await
        .unwrap();
    client
        .add_text("Bananas are a good source of potassium.".to_string(), "nutrition".to_string())
        .await
        .unwrap();

    let options = SearchOptions { similarity_threshold: Some(0.0), ..Default::default() };
    let result = client.search("capital of France", &options).await;

    assert!(result.total_results >= 1);
    assert!(result.results[0].content.to_lowercase().contains("paris"));
}

#[tokio::test]
async fn test_get_context_and_enhance_prompt() {
    let client = build_memory_client().await;
    client
        .add_text("The Eiffel Tower is located in Paris, France.".to_string(), "landmarks".to_string())
        .await
        .unwrap();

    let context = client.get_context("Eiffel Tower location", 3).await;
    if context.total_chunks > 0 {
        let enhanced = client.enhance_prompt("Where is the Eiffel Tower?", 3).await;
        assert!(enhanced.context_count > 0);
        assert!(enhanced.prompt.contains("Question:"));
    }
}

#[tokio::test]
async fn test_update_document_title_and_metadata() {
    let client = build_memory_client().await;
    let result = client.add_text("some content".to_string(), "old".to_string()).await.unwrap();
    let doc_id = result.document_id.unwrap();

    let mut metadata = ragdoll_core::AiMetadata::new();
    metadata.insert("classification".to_string(), serde_json::json!("reference"));
    client
        .update_document(
            doc_id,
            DocumentUpdate { title: Some("new title".to_string()), metadata: Some(metadata) },
        )
        .await
        .unwrap();

    let doc = client.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.title, "new title");
    assert_eq!(doc.metadata.get("classification").unwrap(), "reference");
}

#[tokio::test]
async fn test_delete_document_removes_it() {
    let client = build_memory_client().await;
    let result = client.add_text("ephemeral content".to_string(), "temp".to_string()).await.unwrap();
    let doc_id = result.document_id.unwrap();

    client.delete_document(doc_id).await.unwrap();
    assert!(client.get_document(doc_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_documents_respects_limit() {
    let client = build_memory_client().await;
    for i in 0..3 {
        client.add_text(format!("document number {i}"), format!("doc-{i}")).await.unwrap();
    }

    let all = client.list_documents(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let limited = client.list_documents(Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_reconfigure_replaces_active_configuration() {
    let client = build_memory_client().await;
    let mut config = create_test_config();
    config.llm.embedding_dimension = 32;
    client.configure(config).unwrap();

    // After reconfiguring, newly ingested documents embed at the new
    // dimension via the deterministic fallback provider.
    let result = client.add_text("content after reconfigure".to_string(), "t".to_string()).await.unwrap();
    let doc_id = result.document_id.unwrap();
    assert_eq!(client.document_status(doc_id).await.unwrap(), Some(DocumentStatus::Processed));
}

#[tokio::test]
async fn test_empty_config_validates() {
    let config = RagConfig::default();
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_builder_defaults_to_valid_client() {
    let client = RagClientBuilder::new().with_config(create_test_config()).build().await.unwrap();
    assert!(client.healthy().await);
}
