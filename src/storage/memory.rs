//! In-memory storage backend: `Arc<RwLock<HashMap<...>>>` per table, no
//! persistence. Used by tests and embedded callers that don't want a SQLite
//! file on disk. Generalized from the teacher's in-memory unified-storage
//! pattern (a `RwLock`-guarded map per record kind, scanned in full for
//! lookups) into the five-table shape of `storage::sqlite::SqliteStorage`.

use crate::error::{RagError, Result, StorageError};
use crate::models::{
    AudioContent, Document, DocumentId, DocumentStatus, Embedding, EmbeddingId, Hit, ImageContent,
    TextContent,
};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::{SearchFilters, Storage, UsageTouch};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStorage {
    documents: RwLock<HashMap<DocumentId, Document>>,
    text_contents: RwLock<HashMap<DocumentId, Vec<TextContent>>>,
    image_contents: RwLock<HashMap<DocumentId, Vec<ImageContent>>>,
    audio_contents: RwLock<HashMap<DocumentId, Vec<AudioContent>>>,
    embeddings: RwLock<HashMap<EmbeddingId, Embedding>>,
}

/// Case-insensitive substring match against a metadata value, recursing
/// into arrays so a token inside `keywords: [...]` is found just like a
/// plain string field (spec.md §4.6 "Lexical search" fields include
/// `keywords`, which is array-shaped, not a bare string).
fn value_contains(value: &serde_json::Value, needle: &str) -> bool {
    match value {
        serde_json::Value::String(s) => s.to_lowercase().contains(needle),
        serde_json::Value::Array(items) => items.iter().any(|v| value_contains(v, needle)),
        _ => false,
    }
}

/// Applies `SearchFilters.classification` (exact match) and `.tags`
/// (array-contains, all required) against a joined document's metadata —
/// the same semantic-search step-1 filters `SqliteStorage::nearest_neighbors`
/// applies via SQL (spec.md §4.6 step 1).
fn document_matches_facets(doc: &Document, filters: &crate::storage::SearchFilters) -> bool {
    if let Some(classification) = &filters.classification {
        let matches = doc
            .metadata
            .get("classification")
            .and_then(|v| v.as_str())
            .map(|s| s == classification)
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }

    if !filters.tags.is_empty() {
        let doc_tags: Vec<String> = doc
            .metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(|s| s.to_string()).collect())
            .unwrap_or_default();
        if !filters.tags.iter().all(|t| doc_tags.contains(t)) {
            return false;
        }
    }

    true
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn embeddings_matching(&self, filters: &SearchFilters) -> Vec<Embedding> {
        let embeddings = self.embeddings.read().unwrap();
        let documents = self.documents.read().unwrap();

        embeddings
            .values()
            .filter(|e| {
                if let Some(model) = &filters.embedding_model {
                    if &e.embedding_model != model {
                        return false;
                    }
                }
                if let Some(doc_id) = filters.document_id {
                    if e.document_id != doc_id {
                        return false;
                    }
                }
                if let Some(document_type) = filters.document_type {
                    match documents.get(&e.document_id) {
                        Some(doc) if doc.document_type == document_type => {}
                        _ => return false,
                    }
                }
                if filters.classification.is_some() || !filters.tags.is_empty() {
                    match documents.get(&e.document_id) {
                        Some(doc) if document_matches_facets(doc, filters) => {}
                        _ => return false,
                    }
                }
                true
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert_document(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        if documents.contains_key(&document.id) {
            return Err(RagError::Storage(StorageError::ConstraintViolation(
                format!("document {} already exists", document.id),
            )));
        }
        documents.insert(document.id, document);
        Ok(())
    }

    async fn update_document_status(&self, id: DocumentId, status: DocumentStatus) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        let doc = documents
            .get_mut(&id)
            .ok_or_else(|| RagError::Storage(StorageError::RecordNotFound(id.to_string())))?;
        doc.status = status;
        doc.updated_at = Utc::now();
        Ok(())
    }

    async fn update_document_metadata(
        &self,
        id: DocumentId,
        metadata: crate::models::AiMetadata,
    ) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        let doc = documents
            .get_mut(&id)
            .ok_or_else(|| RagError::Storage(StorageError::RecordNotFound(id.to_string())))?;
        doc.metadata = metadata;
        doc.updated_at = Utc::now();
        Ok(())
    }

    async fn update_document_title(&self, id: DocumentId, title: String) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        let doc = documents
            .get_mut(&id)
            .ok_or_else(|| RagError::Storage(StorageError::RecordNotFound(id.to_string())))?;
        doc.title = title;
        doc.updated_at = Utc::now();
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.documents.read().unwrap().get(&id).cloned())
    }

    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<Document>> {
        let documents = self.documents.read().unwrap();
        let mut all: Vec<Document> = documents.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    async fn delete_document(&self, id: DocumentId) -> Result<()> {
        self.documents.write().unwrap().remove(&id);
        self.text_contents.write().unwrap().remove(&id);
        self.image_contents.write().unwrap().remove(&id);
        self.audio_contents.write().unwrap().remove(&id);
        self.embeddings.write().unwrap().retain(|_, e| e.document_id != id);
        Ok(())
    }

    async fn insert_text_content(&self, content: TextContent) -> Result<()> {
        self.text_contents
            .write()
            .unwrap()
            .entry(content.document_id)
            .or_default()
            .push(content);
        Ok(())
    }

    async fn insert_image_content(&self, content: ImageContent) -> Result<()> {
        self.image_contents
            .write()
            .unwrap()
            .entry(content.document_id)
            .or_default()
            .push(content);
        Ok(())
    }

    async fn insert_audio_content(&self, content: AudioContent) -> Result<()> {
        self.audio_contents
            .write()
            .unwrap()
            .entry(content.document_id)
            .or_default()
            .push(content);
        Ok(())
    }

    async fn text_contents_for_document(&self, document_id: DocumentId) -> Result<Vec<TextContent>> {
        Ok(self
            .text_contents
            .read()
            .unwrap()
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_embedding(&self, embedding: Embedding) -> Result<()> {
        let mut embeddings = self.embeddings.write().unwrap();
        let duplicate = embeddings.values().any(|e| {
            e.embeddable_type == embedding.embeddable_type
                && e.embeddable_id == embedding.embeddable_id
                && e.chunk_index == embedding.chunk_index
        });
        if duplicate {
            return Err(RagError::Storage(StorageError::ConstraintViolation(
                "embedding already exists for this (embeddable, chunk_index)".to_string(),
            )));
        }
        embeddings.insert(embedding.id, embedding);
        Ok(())
    }

    async fn embeddings_for_document(&self, document_id: DocumentId) -> Result<Vec<Embedding>> {
        let embeddings = self.embeddings.read().unwrap();
        let mut matches: Vec<Embedding> = embeddings
            .values()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect();
        matches.sort_by_key(|e| e.chunk_index);
        Ok(matches)
    }

    async fn embedding_count_for_document(&self, document_id: DocumentId) -> Result<usize> {
        Ok(self
            .embeddings
            .read()
            .unwrap()
            .values()
            .filter(|e| e.document_id == document_id)
            .count())
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Hit>> {
        let documents = self.documents.read().unwrap();
        let mut scored: Vec<(f32, Hit)> = self
            .embeddings_matching(filters)
            .into_iter()
            .map(|e| {
                let similarity = SqliteStorage::cosine_similarity(query, &e.embedding_vector);
                let doc = documents.get(&e.document_id);
                let hit = Hit {
                    embedding_id: e.id,
                    content: e.content.clone(),
                    document_id: e.document_id,
                    document_title: doc.map(|d| d.title.clone()).unwrap_or_default(),
                    document_location: doc.map(|d| d.location.clone()).unwrap_or_default(),
                    chunk_index: e.chunk_index,
                    similarity,
                    distance: 1.0 - similarity,
                    usage_count: e.usage_count,
                    returned_at: e.returned_at,
                    usage_score: 0.0,
                    combined_score: similarity,
                    metadata: e.metadata.clone(),
                    search_types: vec!["semantic".to_string()],
                };
                (similarity, hit)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(k).map(|(_, hit)| hit).collect())
    }

    async fn lexical_search(&self, query: &str, limit: usize) -> Result<Vec<Hit>> {
        let needle = query.to_lowercase();
        let documents = self.documents.read().unwrap();

        let mut hits: Vec<Hit> = documents
            .values()
            .filter(|doc| {
                doc.title.to_lowercase().contains(&needle)
                    || doc.metadata.values().any(|v| value_contains(v, &needle))
            })
            .map(|doc| Hit {
                embedding_id: EmbeddingId::new(),
                content: doc.title.clone(),
                document_id: doc.id,
                document_title: doc.title.clone(),
                document_location: doc.location.clone(),
                chunk_index: 0,
                similarity: 0.0,
                distance: 1.0,
                usage_count: 0,
                returned_at: None,
                usage_score: 0.0,
                combined_score: 1.0,
                metadata: HashMap::new(),
                search_types: vec!["lexical".to_string()],
            })
            .take(limit)
            .collect();

        hits.truncate(limit);
        Ok(hits)
    }

    async fn batch_touch_embeddings(&self, touches: &[UsageTouch]) -> Result<()> {
        let mut embeddings = self.embeddings.write().unwrap();
        for touch in touches {
            if let Some(embedding) = embeddings.get_mut(&touch.embedding_id) {
                embedding.usage_count += 1;
                embedding.returned_at = Some(touch.returned_at);
            }
        }
        Ok(())
    }
}
