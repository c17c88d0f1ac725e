//! DOCX parsing (spec.md §4.1): concatenate paragraphs separated by blank
//! lines, then emit each table with a labeled header and pipe-joined rows.
//! Core properties (title/author/subject/...) are captured into
//! `file_metadata`.

use crate::error::{RagError, Result};
use crate::models::{DocumentType, FileMetadata};
use crate::parser::ParsedDocument;
use docx_rs::read_docx;

pub fn parse(data: &[u8]) -> Result<ParsedDocument> {
    let docx = read_docx(data).map_err(|e| RagError::Parse(format!("malformed DOCX: {e:?}")))?;

    let mut paragraphs = Vec::new();
    let mut tables = Vec::new();

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                let text = paragraph_text(p);
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
            docx_rs::DocumentChild::Table(t) => {
                tables.push(render_table(t));
            }
            _ => {}
        }
    }

    let mut content = paragraphs.join("\n\n");
    for (i, rendered) in tables.iter().enumerate() {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&format!("--- Table {} ---\n{}", i + 1, rendered));
    }

    let mut file_metadata = FileMetadata::new();
    let core = &docx.core;
    let mut insert_prop = |label: &str, value: &Option<String>| {
        if let Some(v) = value {
            if !v.is_empty() {
                file_metadata.insert(label.to_string(), v.clone().into());
            }
        }
    };
    insert_prop("title", &core.title);
    insert_prop("subject", &core.subject);
    insert_prop("creator", &core.creator);
    insert_prop("description", &core.description);
    insert_prop("keywords", &core.keywords);
    insert_prop("last_modified_by", &core.last_modified_by);
    if let Some(created) = &core.created {
        file_metadata.insert("created".to_string(), created.clone().into());
    }
    if let Some(modified) = &core.modified {
        file_metadata.insert("modified".to_string(), modified.clone().into());
    }

    let title = core.title.clone().filter(|s| !s.is_empty());

    Ok(ParsedDocument {
        content,
        document_type: DocumentType::Docx,
        file_metadata,
        title,
    })
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let docx_rs::RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

fn render_table(t: &docx_rs::Table) -> String {
    let mut rows = Vec::new();
    for row in &t.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            let mut cell_text = Vec::new();
            for content in &cell.children {
                if let docx_rs::TableCellContent::Paragraph(p) = content {
                    cell_text.push(paragraph_text(p));
                }
            }
            cells.push(cell_text.join(" "));
        }
        rows.push(cells.join(" | "));
    }
    rows.join("\n")
}
