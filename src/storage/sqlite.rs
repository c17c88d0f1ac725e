//! SQLite storage backend. Brute-force vector search lives here too: no
//! vector index, embeddings are scanned in full and ranked in Rust
//! (spec.md §4.6 Non-goals — "no ANN index required for the reference
//! implementation"). Generalized from the teacher's `memory.rs::SqliteMemoryStore`
//! (single-table memory store) into the five-table schema spec.md §6 names.

use crate::error::{RagError, Result, StorageError};
use crate::models::{
    AudioContent, Document, DocumentId, DocumentStatus, DocumentType, Embedding, EmbeddableType,
    EmbeddingId, Hit, ImageContent, TextContent,
};
use crate::storage::{SearchFilters, Storage, UsageTouch};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        if let Some(db_path) = database_url.strip_prefix("sqlite:") {
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let database_url = if database_url.contains('?') {
            if database_url.contains("mode=") {
                database_url.to_string()
            } else {
                format!("{database_url}&mode=rwc")
            }
        } else {
            format!("{database_url}?mode=rwc")
        };

        let pool = SqlitePool::connect(&database_url).await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                location TEXT NOT NULL,
                title TEXT NOT NULL,
                document_type TEXT NOT NULL,
                status TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                file_metadata TEXT NOT NULL DEFAULT '{}',
                file_blob BLOB,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS text_contents (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                chunk_size INTEGER NOT NULL,
                overlap INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS image_contents (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                description TEXT,
                alt_text TEXT,
                image_blob BLOB,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audio_contents (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                transcript TEXT,
                duration REAL,
                sample_rate INTEGER,
                audio_blob BLOB,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                id TEXT PRIMARY KEY,
                embeddable_type TEXT NOT NULL,
                embeddable_id TEXT NOT NULL,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding_vector BLOB NOT NULL,
                embedding_model TEXT NOT NULL,
                usage_count INTEGER NOT NULL DEFAULT 0,
                returned_at TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                UNIQUE(embeddable_type, embeddable_id, chunk_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_document_id ON embeddings(document_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)")
            .execute(&self.pool)
            .await?;

        info!("sqlite storage migrated");
        Ok(())
    }

    pub fn serialize_embedding(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    pub fn deserialize_embedding(data: &[u8]) -> Vec<f32> {
        data.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// `dot(a,b) / (||a|| * ||b||)`, 0 for mismatched length or zero
    /// magnitude (spec.md §4.6, Testable Property 6).
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
        let document_type: String = row.try_get("document_type")?;
        let status: String = row.try_get("status")?;
        let metadata: String = row.try_get("metadata")?;
        let file_metadata: String = row.try_get("file_metadata")?;

        Ok(Document {
            id: DocumentId::from_str(&row.try_get::<String, _>("id")?)
                .map_err(|e| RagError::Document(e.to_string()))?,
            location: row.try_get("location")?,
            title: row.try_get("title")?,
            document_type: parse_document_type(&document_type)?,
            status: parse_status(&status)?,
            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
            file_metadata: serde_json::from_str(&file_metadata).unwrap_or_default(),
            file_blob: row.try_get("file_blob")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn parse_document_type(s: &str) -> Result<DocumentType> {
    Ok(match s {
        "text" => DocumentType::Text,
        "image" => DocumentType::Image,
        "audio" => DocumentType::Audio,
        "pdf" => DocumentType::Pdf,
        "docx" => DocumentType::Docx,
        "html" => DocumentType::Html,
        "markdown" => DocumentType::Markdown,
        "mixed" => DocumentType::Mixed,
        other => return Err(RagError::Document(format!("unknown document_type: {other}"))),
    })
}

fn parse_status(s: &str) -> Result<DocumentStatus> {
    Ok(match s {
        "pending" => DocumentStatus::Pending,
        "processing" => DocumentStatus::Processing,
        "processed" => DocumentStatus::Processed,
        "error" => DocumentStatus::Error,
        other => return Err(RagError::Document(format!("unknown status: {other}"))),
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert_document(&self, document: Document) -> Result<()> {
        let metadata = serde_json::to_string(&document.metadata)?;
        let file_metadata = serde_json::to_string(&document.file_metadata)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, location, title, document_type, status, metadata, file_metadata, file_blob, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(document.id.to_string())
        .bind(&document.location)
        .bind(&document.title)
        .bind(document.document_type.to_string())
        .bind(format!("{:?}", document.status).to_lowercase())
        .bind(metadata)
        .bind(file_metadata)
        .bind(document.file_blob)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_document_status(&self, id: DocumentId, status: DocumentStatus) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE documents SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(format!("{:?}", status).to_lowercase())
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RagError::Storage(StorageError::RecordNotFound(id.to_string())));
        }
        Ok(())
    }

    async fn update_document_metadata(
        &self,
        id: DocumentId,
        metadata: crate::models::AiMetadata,
    ) -> Result<()> {
        let metadata_json = serde_json::to_string(&metadata)?;
        let now = Utc::now();
        sqlx::query("UPDATE documents SET metadata = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(metadata_json)
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_document_title(&self, id: DocumentId, title: String) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE documents SET title = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(title)
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::document_from_row(&r)).transpose()
    }

    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<Document>> {
        let limit = limit.unwrap_or(1000) as i64;
        let rows = sqlx::query("SELECT * FROM documents ORDER BY created_at DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::document_from_row).collect()
    }

    async fn delete_document(&self, id: DocumentId) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_text_content(&self, content: TextContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO text_contents (id, document_id, content, embedding_model, chunk_size, overlap, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(content.id.to_string())
        .bind(content.document_id.to_string())
        .bind(&content.content)
        .bind(&content.embedding_model)
        .bind(content.chunk_size as i64)
        .bind(content.overlap as i64)
        .bind(content.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_image_content(&self, content: ImageContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO image_contents (id, document_id, description, alt_text, image_blob, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(content.id.to_string())
        .bind(content.document_id.to_string())
        .bind(&content.description)
        .bind(&content.alt_text)
        .bind(content.image_blob)
        .bind(content.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_audio_content(&self, content: AudioContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audio_contents (id, document_id, transcript, duration, sample_rate, audio_blob, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(content.id.to_string())
        .bind(content.document_id.to_string())
        .bind(&content.transcript)
        .bind(content.duration)
        .bind(content.sample_rate.map(|s| s as i64))
        .bind(content.audio_blob)
        .bind(content.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn text_contents_for_document(&self, document_id: DocumentId) -> Result<Vec<TextContent>> {
        let rows = sqlx::query("SELECT * FROM text_contents WHERE document_id = ?1")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TextContent {
                    id: crate::models::ContentId::from_str(&row.try_get::<String, _>("id")?)
                        .map_err(|e| RagError::Document(e.to_string()))?,
                    document_id,
                    content: row.try_get("content")?,
                    embedding_model: row.try_get("embedding_model")?,
                    chunk_size: row.try_get::<i64, _>("chunk_size")? as usize,
                    overlap: row.try_get::<i64, _>("overlap")? as usize,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn insert_embedding(&self, embedding: Embedding) -> Result<()> {
        let blob = Self::serialize_embedding(&embedding.embedding_vector);
        let metadata = serde_json::to_string(&embedding.metadata)?;

        let result = sqlx::query(
            r#"
            INSERT INTO embeddings (id, embeddable_type, embeddable_id, document_id, chunk_index, content, embedding_vector, embedding_model, usage_count, returned_at, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(embedding.id.to_string())
        .bind(embedding.embeddable_type.to_string())
        .bind(embedding.embeddable_id.to_string())
        .bind(embedding.document_id.to_string())
        .bind(embedding.chunk_index as i64)
        .bind(&embedding.content)
        .bind(blob)
        .bind(&embedding.embedding_model)
        .bind(embedding.usage_count)
        .bind(embedding.returned_at)
        .bind(metadata)
        .bind(embedding.created_at)
        .execute(&self.pool)
        .await;

        result.map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE") => {
                RagError::Storage(StorageError::ConstraintViolation(db_err.message().to_string()))
            }
            _ => RagError::Database(e),
        })?;

        Ok(())
    }

    async fn embeddings_for_document(&self, document_id: DocumentId) -> Result<Vec<Embedding>> {
        let rows = sqlx::query("SELECT * FROM embeddings WHERE document_id = ?1 ORDER BY chunk_index")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_embedding).collect()
    }

    async fn embedding_count_for_document(&self, document_id: DocumentId) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM embeddings WHERE document_id = ?1")
            .bind(document_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("c")? as usize)
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Hit>> {
        let mut sql = String::from(
            "SELECT e.*, d.title as doc_title, d.location as doc_location, d.document_type as doc_type \
             FROM embeddings e JOIN documents d ON e.document_id = d.id WHERE 1=1",
        );

        if filters.document_type.is_some() {
            sql.push_str(" AND d.document_type = ?");
        }
        if filters.embedding_model.is_some() {
            sql.push_str(" AND e.embedding_model = ?");
        }
        if filters.document_id.is_some() {
            sql.push_str(" AND e.document_id = ?");
        }
        if filters.classification.is_some() {
            sql.push_str(" AND json_extract(d.metadata, '$.classification') = ?");
        }
        for _ in &filters.tags {
            sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(d.metadata, '$.tags') WHERE value = ?)");
        }

        let mut q = sqlx::query(&sql);
        if let Some(dt) = filters.document_type {
            q = q.bind(dt.to_string());
        }
        if let Some(model) = &filters.embedding_model {
            q = q.bind(model.clone());
        }
        if let Some(doc_id) = filters.document_id {
            q = q.bind(doc_id.to_string());
        }
        if let Some(classification) = &filters.classification {
            q = q.bind(classification.clone());
        }
        for tag in &filters.tags {
            q = q.bind(tag.clone());
        }

        let rows = q.fetch_all(&self.pool).await?;

        let mut scored: Vec<(f32, Hit)> = Vec::with_capacity(rows.len());
        for row in rows {
            let vector_blob: Vec<u8> = row.try_get("embedding_vector")?;
            let vector = Self::deserialize_embedding(&vector_blob);
            let similarity = Self::cosine_similarity(query, &vector);

            let metadata_json: String = row.try_get("metadata")?;
            let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json).unwrap_or_default();

            let hit = Hit {
                embedding_id: EmbeddingId::from_str(&row.try_get::<String, _>("id")?)
                    .map_err(|e| RagError::Document(e.to_string()))?,
                content: row.try_get("content")?,
                document_id: DocumentId::from_str(&row.try_get::<String, _>("document_id")?)
                    .map_err(|e| RagError::Document(e.to_string()))?,
                document_title: row.try_get("doc_title")?,
                document_location: row.try_get("doc_location")?,
                chunk_index: row.try_get::<i64, _>("chunk_index")? as usize,
                similarity,
                distance: 1.0 - similarity,
                usage_count: row.try_get("usage_count")?,
                returned_at: row.try_get("returned_at")?,
                usage_score: 0.0,
                combined_score: similarity,
                metadata,
                search_types: vec!["semantic".to_string()],
            };

            scored.push((similarity, hit));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(k).map(|(_, hit)| hit).collect())
    }

    async fn lexical_search(&self, query: &str, limit: usize) -> Result<Vec<Hit>> {
        let pattern = format!("%{}%", query.to_lowercase());

        let rows = sqlx::query(
            r#"
            SELECT * FROM documents
            WHERE lower(title) LIKE ?1 OR lower(metadata) LIKE ?1
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let document = Self::document_from_row(&row)?;
            hits.push(Hit {
                embedding_id: EmbeddingId::new(),
                content: document.title.clone(),
                document_id: document.id,
                document_title: document.title,
                document_location: document.location,
                chunk_index: 0,
                similarity: 0.0,
                distance: 1.0,
                usage_count: 0,
                returned_at: None,
                usage_score: 0.0,
                combined_score: 1.0,
                metadata: HashMap::new(),
                search_types: vec!["lexical".to_string()],
            });
        }

        Ok(hits)
    }

    async fn batch_touch_embeddings(&self, touches: &[UsageTouch]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for touch in touches {
            sqlx::query(
                "UPDATE embeddings SET usage_count = usage_count + 1, returned_at = ?1 WHERE id = ?2",
            )
            .bind(touch.returned_at)
            .bind(touch.embedding_id.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_embedding(row: sqlx::sqlite::SqliteRow) -> Result<Embedding> {
    let vector_blob: Vec<u8> = row.try_get("embedding_vector")?;
    let metadata_json: String = row.try_get("metadata")?;
    let embeddable_type: String = row.try_get("embeddable_type")?;

    Ok(Embedding {
        id: EmbeddingId::from_str(&row.try_get::<String, _>("id")?)
            .map_err(|e| RagError::Document(e.to_string()))?,
        embeddable_type: embeddable_type
            .parse()
            .map_err(|_: RagError| RagError::Document("bad embeddable_type".to_string()))?,
        embeddable_id: crate::models::ContentId::from_str(&row.try_get::<String, _>("embeddable_id")?)
            .map_err(|e| RagError::Document(e.to_string()))?,
        document_id: DocumentId::from_str(&row.try_get::<String, _>("document_id")?)
            .map_err(|e| RagError::Document(e.to_string()))?,
        chunk_index: row.try_get::<i64, _>("chunk_index")? as usize,
        content: row.try_get("content")?,
        embedding_vector: SqliteStorage::deserialize_embedding(&vector_blob),
        embedding_model: row.try_get("embedding_model")?,
        usage_count: row.try_get("usage_count")?,
        returned_at: row.try_get("returned_at")?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identity() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((SqliteStorage::cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((SqliteStorage::cosine_similarity(&a, &b) - -1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 0.0];
        assert_eq!(SqliteStorage::cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_mismatched_length() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(SqliteStorage::cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let vector = vec![0.1_f32, -0.2, 3.5];
        let bytes = SqliteStorage::serialize_embedding(&vector);
        let restored = SqliteStorage::deserialize_embedding(&bytes);
        assert_eq!(vector, restored);
    }

    #[tokio::test]
    async fn test_insert_and_get_document() {
        let storage = SqliteStorage::new("sqlite::memory:").await.unwrap();
        let doc = Document::new("file.txt".into(), "Title".into(), DocumentType::Text);
        let id = doc.id;
        storage.insert_document(doc).await.unwrap();

        let fetched = storage.get_document(id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Title");
        assert_eq!(fetched.status, DocumentStatus::Pending);
    }

    proptest::proptest! {
        /// Cosine similarity is symmetric and bounded to [-1, 1] for any
        /// pair of equal-length vectors (spec.md §8, Testable Property 6).
        #[test]
        fn prop_cosine_similarity_symmetric_and_bounded(
            a in proptest::collection::vec(-10.0f32..10.0, 1..8),
            b in proptest::collection::vec(-10.0f32..10.0, 1..8),
        ) {
            let len = a.len().min(b.len());
            let a = &a[..len];
            let b = &b[..len];
            let sim_ab = SqliteStorage::cosine_similarity(a, b);
            let sim_ba = SqliteStorage::cosine_similarity(b, a);
            proptest::prop_assert!((sim_ab - sim_ba).abs() < 1e-5);
            proptest::prop_assert!(sim_ab >= -1.0 - 1e-5 && sim_ab <= 1.0 + 1e-5);
        }
    }

    #[tokio::test]
    async fn test_delete_document_cascades_embeddings() {
        let storage = SqliteStorage::new("sqlite::memory:").await.unwrap();
        let doc = Document::new("file.txt".into(), "Title".into(), DocumentType::Text);
        let doc_id = doc.id;
        storage.insert_document(doc).await.unwrap();

        let content = TextContent {
            id: crate::models::ContentId::new(),
            document_id: doc_id,
            content: "hello world".to_string(),
            embedding_model: "test-model".to_string(),
            chunk_size: 1000,
            overlap: 200,
            created_at: Utc::now(),
        };
        let content_id = content.id;
        storage.insert_text_content(content).await.unwrap();

        let embedding = Embedding {
            id: EmbeddingId::new(),
            embeddable_type: EmbeddableType::TextContent,
            embeddable_id: content_id,
            document_id: doc_id,
            chunk_index: 0,
            content: "hello world".to_string(),
            embedding_vector: vec![1.0, 0.0, 0.0],
            embedding_model: "test-model".to_string(),
            usage_count: 0,
            returned_at: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        };
        storage.insert_embedding(embedding).await.unwrap();

        assert_eq!(storage.embedding_count_for_document(doc_id).await.unwrap(), 1);

        storage.delete_document(doc_id).await.unwrap();
        assert_eq!(storage.embedding_count_for_document(doc_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nearest_neighbors_filters_by_classification_and_tags() {
        let storage = SqliteStorage::new("sqlite::memory:").await.unwrap();

        let mut technical_doc = Document::new("a.txt".into(), "A".into(), DocumentType::Text);
        technical_doc.metadata.insert("classification".into(), serde_json::json!("technical"));
        technical_doc.metadata.insert("tags".into(), serde_json::json!(["rust", "async"]));
        let technical_id = technical_doc.id;
        storage.insert_document(technical_doc).await.unwrap();

        let mut personal_doc = Document::new("b.txt".into(), "B".into(), DocumentType::Text);
        personal_doc.metadata.insert("classification".into(), serde_json::json!("personal"));
        personal_doc.metadata.insert("tags".into(), serde_json::json!(["diary"]));
        let personal_id = personal_doc.id;
        storage.insert_document(personal_doc).await.unwrap();

        for (doc_id, vector) in [(technical_id, vec![1.0, 0.0]), (personal_id, vec![1.0, 0.0])] {
            let embedding = Embedding {
                id: EmbeddingId::new(),
                embeddable_type: EmbeddableType::TextContent,
                embeddable_id: crate::models::ContentId::new(),
                document_id: doc_id,
                chunk_index: 0,
                content: "chunk".to_string(),
                embedding_vector: vector,
                embedding_model: "m".to_string(),
                usage_count: 0,
                returned_at: None,
                metadata: HashMap::new(),
                created_at: Utc::now(),
            };
            storage.insert_embedding(embedding).await.unwrap();
        }

        let by_classification = storage
            .nearest_neighbors(
                &[1.0, 0.0],
                10,
                &SearchFilters { classification: Some("technical".to_string()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(by_classification.len(), 1);
        assert_eq!(by_classification[0].document_id, technical_id);

        let by_tags = storage
            .nearest_neighbors(
                &[1.0, 0.0],
                10,
                &SearchFilters { tags: vec!["diary".to_string()], ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(by_tags.len(), 1);
        assert_eq!(by_tags[0].document_id, personal_id);
    }
}
