//! Markdown is treated as text (content preserved verbatim); the chunker
//! has a dedicated structure-aware mode (see `crate::chunker::chunk_markdown`).

use crate::error::Result;
use crate::models::DocumentType;
use crate::parser::{text, ParsedDocument};

pub fn parse(data: &[u8]) -> Result<ParsedDocument> {
    let mut parsed = text::parse(data)?;
    parsed.document_type = DocumentType::Markdown;
    Ok(parsed)
}
