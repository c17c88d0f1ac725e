//! PDF parsing (spec.md §4.1): iterate pages, concatenate text with a page
//! separator, extract info-dictionary fields into `file_metadata`, record
//! page count.
//!
//! Uses `lopdf` for document structure (page count, info dictionary) and
//! `pdf-extract` for text streams, mirroring this crate's existing
//! `pdf = ["pdf-extract", "lopdf", "table-extract"]` feature.

use crate::error::{RagError, Result};
use crate::models::{DocumentType, FileMetadata};
use crate::parser::ParsedDocument;
use lopdf::Document as LoDocument;

pub fn parse(data: &[u8]) -> Result<ParsedDocument> {
    let lo = LoDocument::load_mem(data)
        .map_err(|e| RagError::Parse(format!("malformed PDF: {e}")))?;

    let page_count = lo.get_pages().len();
    let mut file_metadata = FileMetadata::new();
    file_metadata.insert("page_count".to_string(), page_count.into());

    if let Ok(trailer_info) = lo.trailer.get(b"Info") {
        if let Ok(info_ref) = trailer_info.as_reference() {
            if let Ok(info_obj) = lo.get_object(info_ref) {
                if let Ok(dict) = info_obj.as_dict() {
                    for (key, label) in [
                        (b"Title".as_slice(), "title"),
                        (b"Author", "author"),
                        (b"Subject", "subject"),
                        (b"Creator", "creator"),
                        (b"Producer", "producer"),
                        (b"CreationDate", "created"),
                        (b"ModDate", "modified"),
                    ] {
                        if let Ok(value) = dict.get(key) {
                            if let Ok(text) = value.as_str() {
                                let decoded = String::from_utf8_lossy(text).into_owned();
                                if !decoded.is_empty() {
                                    file_metadata.insert(label.to_string(), decoded.into());
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    let raw_text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| RagError::Parse(format!("failed to extract PDF text: {e}")))?;

    // pdf-extract separates pages with form-feed characters; re-join with
    // an explicit marker line per spec.md §4.1 ("a marker line per page
    // for page > 1").
    let content = raw_text
        .split('\u{c}')
        .enumerate()
        .map(|(i, page)| {
            if i == 0 {
                page.to_string()
            } else {
                format!("--- Page {} ---\n{}", i + 1, page)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let title = file_metadata
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(ParsedDocument {
        content,
        document_type: DocumentType::Pdf,
        file_metadata,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_pdf_raises_parse_error() {
        let data = b"not a pdf at all";
        let result = parse(data);
        assert!(result.is_err());
    }
}
