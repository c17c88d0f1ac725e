//! ragdoll_core: a document ingestion and retrieval engine for
//! retrieval-augmented generation.
//!
//! Parses documents into extracted text, generates schema-constrained
//! metadata and embeddings through a provider-agnostic LLM gateway, persists
//! everything behind a swappable storage backend, and serves semantic,
//! lexical, and hybrid search with usage-aware re-ranking.
//!
//! # Example
//!
//! ```rust,no_run
//! use ragdoll_core::{RagClient, RagClientBuilder, DocumentSource, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RagClientBuilder::new().build().await?;
//!
//!     client
//!         .add_text("Paris is the capital of France.".to_string(), "geo".to_string())
//!         .await?;
//!
//!     let results = client.search("capital of France", &SearchOptions::default()).await;
//!     println!("found {} hits", results.results.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunker;
pub mod client;
pub mod config;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod parser;
pub mod search;
pub mod storage;

pub use cache::{CacheStats, LlmCache, LlmCacheConfig};
pub use chunker::ContentChunker;
pub use client::{
    AddDocumentResult, ClientStats, ContextChunk, ContextResult, DirectoryEntryResult,
    DocumentSource, DocumentUpdate, EnhancedPrompt, RagClient, RagClientBuilder, SearchResult,
};
pub use config::{ChunkingConfig, JobConfig, LlmConfig, MetadataConfig, RagConfig, SearchConfig, StorageConfig};
pub use error::{LlmError, RagError, Result, StorageError};
pub use jobs::{JobRunner, Stage};
pub use llm::{system_message, user_message, EmbeddingResponse, GenerationResponse, LlmGateway, Message, Role};
pub use metadata::{MetadataGenerator, MetadataSchema, ValidationWarning};
pub use models::{
    AiMetadata, AudioContent, ContentId, Document, DocumentId, DocumentStatus, DocumentType,
    EmbeddableType, Embedding, EmbeddingId, FileMetadata, Hit, ImageContent, TextContent,
};
pub use parser::{DocumentParser, ParseSource, ParsedDocument};
pub use search::{FacetFilters, QueryInput, SearchEngine, SearchOptions};
pub use storage::{InMemoryStorage, SearchFilters, SqliteStorage, Storage, UsageTouch};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
