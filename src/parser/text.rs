//! Plain text / unknown-extension parsing (spec.md §4.1).
//!
//! Reads as UTF-8; on encoding error retries as ISO-8859-1 (via
//! `encoding_rs`) and records the effective encoding in `file_metadata`.

use crate::error::Result;
use crate::models::{DocumentType, FileMetadata};
use crate::parser::ParsedDocument;

pub fn parse(data: &[u8]) -> Result<ParsedDocument> {
    let mut file_metadata = FileMetadata::new();

    let content = match std::str::from_utf8(data) {
        Ok(s) => {
            file_metadata.insert("encoding".to_string(), "utf-8".into());
            s.to_string()
        }
        Err(_) => {
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(data);
            file_metadata.insert(
                "encoding".to_string(),
                "iso-8859-1".into(),
            );
            if had_errors {
                file_metadata.insert("encoding_had_errors".to_string(), true.into());
            }
            cow.into_owned()
        }
    };

    Ok(ParsedDocument {
        content,
        document_type: DocumentType::Text,
        file_metadata,
        title: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_text_parses_directly() {
        let parsed = parse("hello world".as_bytes()).unwrap();
        assert_eq!(parsed.content, "hello world");
        assert_eq!(parsed.file_metadata["encoding"], "utf-8");
    }

    #[test]
    fn test_non_utf8_falls_back_to_latin1() {
        // 0xE9 is "é" in ISO-8859-1/Windows-1252, invalid as a UTF-8 lead byte.
        let data = vec![b'c', b'a', b'f', 0xE9];
        let parsed = parse(&data).unwrap();
        assert!(parsed.content.contains('\u{e9}'));
        assert_eq!(parsed.file_metadata["encoding"], "iso-8859-1");
    }
}
