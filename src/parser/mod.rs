//! Document parser (C3): maps a source to `{content, media_type, file_metadata}`.

pub mod docx;
pub mod html;
pub mod markdown;
pub mod pdf;
pub mod text;

use crate::error::{RagError, Result};
use crate::models::{DocumentType, FileMetadata};
use std::path::PathBuf;

/// Where the document's bytes come from.
pub enum ParseSource {
    Path(PathBuf),
    Bytes { data: Vec<u8>, hint: Option<String> },
}

/// Result of parsing: extracted text, detected media type, and any
/// file-derived metadata (page count, encoding, core properties, ...).
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    pub document_type: DocumentType,
    pub file_metadata: FileMetadata,
    pub title: Option<String>,
}

/// Dispatches by extension, falling back to content sniffing and then to
/// plain text, per spec.md §4.1.
pub struct DocumentParser;

impl DocumentParser {
    pub fn parse(source: &ParseSource) -> Result<ParsedDocument> {
        match source {
            ParseSource::Path(path) => {
                let bytes = std::fs::read(path)?;
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|s| s.to_lowercase());
                Self::parse_bytes(&bytes, ext.as_deref())
            }
            ParseSource::Bytes { data, hint } => Self::parse_bytes(data, hint.as_deref()),
        }
    }

    fn parse_bytes(data: &[u8], ext_hint: Option<&str>) -> Result<ParsedDocument> {
        match ext_hint {
            Some("pdf") => pdf::parse(data),
            Some("docx") => docx::parse(data),
            Some("html") | Some("htm") => html::parse(data),
            Some("md") | Some("markdown") => markdown::parse(data),
            Some("txt") | None => text::parse(data),
            Some(_) => {
                if sniff_is_pdf(data) {
                    pdf::parse(data)
                } else {
                    text::parse(data)
                }
            }
        }
    }
}

fn sniff_is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}

impl From<std::string::FromUtf8Error> for RagError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        RagError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension_falls_back_to_text() {
        let parsed = DocumentParser::parse(&ParseSource::Bytes {
            data: b"hello world".to_vec(),
            hint: Some("xyz".to_string()),
        })
        .unwrap();
        assert_eq!(parsed.document_type, DocumentType::Text);
        assert_eq!(parsed.content, "hello world");
    }

    #[test]
    fn test_pdf_sniffed_from_bytes_without_extension() {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.extend_from_slice(b"garbage");
        let result = DocumentParser::parse(&ParseSource::Bytes { data, hint: None });
        // Malformed PDF bytes are expected to fail parsing, but must be
        // routed through the pdf parser, not silently treated as text.
        assert!(result.is_err());
    }
}
