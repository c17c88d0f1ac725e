//! Storage layer: the single source of truth for documents, content
//! records, and embeddings (spec.md §3, §6). All mutation flows through
//! the `Storage` trait; `SqliteStorage` is the production backend,
//! `InMemoryStorage` exists for tests and embedded use.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::models::{
    AudioContent, Document, DocumentId, DocumentStatus, DocumentType, Embedding, EmbeddableType,
    EmbeddingId, Hit, ImageContent, TextContent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

/// Filters applied before the nearest-neighbor scan (spec.md §4.6 step 1).
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub document_type: Option<DocumentType>,
    pub classification: Option<String>,
    pub tags: Vec<String>,
    pub embedding_model: Option<String>,
    pub document_id: Option<DocumentId>,
}

/// A single usage-counter mutation applied in the post-search batch update
/// (spec.md §4.6 step 6 — one atomic update per search, not per hit).
#[derive(Debug, Clone)]
pub struct UsageTouch {
    pub embedding_id: EmbeddingId,
    pub returned_at: DateTime<Utc>,
}

/// The storage trait every backend implements (spec.md §6 persisted state
/// layout + required store capabilities).
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_document(&self, document: Document) -> Result<()>;
    async fn update_document_status(&self, id: DocumentId, status: DocumentStatus) -> Result<()>;
    async fn update_document_metadata(
        &self,
        id: DocumentId,
        metadata: crate::models::AiMetadata,
    ) -> Result<()>;
    async fn update_document_title(&self, id: DocumentId, title: String) -> Result<()>;
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>>;
    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<Document>>;
    /// Cascades to content records and, transitively, their embeddings
    /// (spec.md §3 Invariant 4).
    async fn delete_document(&self, id: DocumentId) -> Result<()>;

    async fn insert_text_content(&self, content: TextContent) -> Result<()>;
    async fn insert_image_content(&self, content: ImageContent) -> Result<()>;
    async fn insert_audio_content(&self, content: AudioContent) -> Result<()>;
    async fn text_contents_for_document(&self, document_id: DocumentId) -> Result<Vec<TextContent>>;

    async fn insert_embedding(&self, embedding: Embedding) -> Result<()>;
    async fn embeddings_for_document(&self, document_id: DocumentId) -> Result<Vec<Embedding>>;
    async fn embedding_count_for_document(&self, document_id: DocumentId) -> Result<usize>;

    /// Brute-force cosine nearest-neighbor scan over candidates passing
    /// `filters`, returning the `k` closest embeddings with their parent
    /// document context already joined in.
    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Hit>>;

    /// Case-insensitive token match across title + AI-metadata fields
    /// (spec.md §4.6 "Lexical search").
    async fn lexical_search(&self, query: &str, limit: usize) -> Result<Vec<Hit>>;

    /// Single atomic batch update of `usage_count`/`returned_at` for every
    /// embedding returned by one search call.
    async fn batch_touch_embeddings(&self, touches: &[UsageTouch]) -> Result<()>;
}

pub fn embeddable_type_for(document_type: DocumentType) -> EmbeddableType {
    match document_type {
        DocumentType::Image => EmbeddableType::ImageContent,
        DocumentType::Audio => EmbeddableType::AudioContent,
        _ => EmbeddableType::TextContent,
    }
}
