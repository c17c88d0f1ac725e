//! The polymorphic content/embedding data model (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

id_newtype!(DocumentId);
id_newtype!(ContentId);
id_newtype!(EmbeddingId);

/// Document media type, drives parser/chunker/metadata-schema selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Text,
    Image,
    Audio,
    Pdf,
    Docx,
    Html,
    Markdown,
    Mixed,
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentType::Text => "text",
            DocumentType::Image => "image",
            DocumentType::Audio => "audio",
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Html => "html",
            DocumentType::Markdown => "markdown",
            DocumentType::Mixed => "mixed",
        };
        write!(f, "{}", s)
    }
}

/// Document processing lifecycle (spec.md §3 Invariant 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

/// Which child table an `Embedding` belongs to (the polymorphic pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddableType {
    TextContent,
    ImageContent,
    AudioContent,
}

impl std::fmt::Display for EmbeddableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmbeddableType::TextContent => "text_content",
            EmbeddableType::ImageContent => "image_content",
            EmbeddableType::AudioContent => "audio_content",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EmbeddableType {
    type Err = crate::error::RagError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text_content" => Ok(EmbeddableType::TextContent),
            "image_content" => Ok(EmbeddableType::ImageContent),
            "audio_content" => Ok(EmbeddableType::AudioContent),
            other => Err(crate::error::RagError::Document(format!(
                "unknown embeddable_type: {other}"
            ))),
        }
    }
}

/// File-derived metadata (size, MIME, dimensions, duration, ...). Disjoint
/// from AI-derived `metadata` per spec.md §3 Invariant 6.
pub type FileMetadata = HashMap<String, serde_json::Value>;

/// AI-derived, schema-tagged metadata (summary/keywords/classification/...).
pub type AiMetadata = HashMap<String, serde_json::Value>;

/// One per ingested source (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub location: String,
    pub title: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub metadata: AiMetadata,
    pub file_metadata: FileMetadata,
    pub file_blob: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(location: String, title: String, document_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            location,
            title,
            document_type,
            status: DocumentStatus::Pending,
            metadata: AiMetadata::new(),
            file_metadata: FileMetadata::new(),
            file_blob: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Text modality child record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub id: ContentId,
    pub document_id: DocumentId,
    pub content: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub overlap: usize,
    pub created_at: DateTime<Utc>,
}

/// Image modality child record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub id: ContentId,
    pub document_id: DocumentId,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub image_blob: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// Audio modality child record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioContent {
    pub id: ContentId,
    pub document_id: DocumentId,
    pub transcript: Option<String>,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub audio_blob: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// A fixed-dimension vector derived from a chunk of a content record
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub id: EmbeddingId,
    pub embeddable_type: EmbeddableType,
    pub embeddable_id: ContentId,
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub content: String,
    pub embedding_vector: Vec<f32>,
    pub embedding_model: String,
    pub usage_count: i64,
    pub returned_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// A single search result record (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub embedding_id: EmbeddingId,
    pub content: String,
    pub document_id: DocumentId,
    pub document_title: String,
    pub document_location: String,
    pub chunk_index: usize,
    pub similarity: f32,
    pub distance: f32,
    /// Carried through from the underlying embedding so the search engine
    /// can compute `usage_score` without a second round-trip; not part of
    /// spec.md's Hit field list itself, just plumbing for it.
    pub usage_count: i64,
    pub returned_at: Option<DateTime<Utc>>,
    pub usage_score: f32,
    pub combined_score: f32,
    pub metadata: HashMap<String, String>,
    pub search_types: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_new_defaults_pending() {
        let doc = Document::new("file.txt".into(), "t".into(), DocumentType::Text);
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_embeddable_type_roundtrip() {
        use std::str::FromStr;
        assert_eq!(
            EmbeddableType::from_str("text_content").unwrap(),
            EmbeddableType::TextContent
        );
        assert_eq!(EmbeddableType::TextContent.to_string(), "text_content");
    }

    #[test]
    fn test_id_newtype_roundtrip() {
        use std::str::FromStr;
        let id = DocumentId::new();
        let s = id.to_string();
        let parsed = DocumentId::from_str(&s).unwrap();
        assert_eq!(id, parsed);
    }
}
