//! HTML parsing (spec.md §4.1): strip `<script>`/`<style>` block contents
//! first, then all remaining tags, then collapse whitespace.
//!
//! Grounded in the same regex-based tag-stripping idiom used elsewhere in
//! the corpus for scraped HTML content.

use crate::error::Result;
use crate::models::{DocumentType, FileMetadata};
use crate::parser::ParsedDocument;
use regex::Regex;

pub fn parse(data: &[u8]) -> Result<ParsedDocument> {
    let html = String::from_utf8_lossy(data).into_owned();
    let content = extract_text(&html);

    Ok(ParsedDocument {
        content,
        document_type: DocumentType::Html,
        file_metadata: FileMetadata::new(),
        title: extract_title(&html),
    })
}

pub fn extract_text(html: &str) -> String {
    let script_re = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_re = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let tag_re = Regex::new(r"<[^>]*>").unwrap();
    let whitespace_re = Regex::new(r"\s+").unwrap();

    let no_scripts = script_re.replace_all(html, "");
    let no_styles = style_re.replace_all(&no_scripts, "");
    let no_tags = tag_re.replace_all(&no_styles, " ");
    whitespace_re.replace_all(&no_tags, " ").trim().to_string()
}

fn extract_title(html: &str) -> Option<String> {
    let title_re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    title_re
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
