//! Metadata Generator (C6): builds provider prompts constrained by
//! media-type-specific schemas, validates the result, and merges it over
//! any existing document metadata (spec.md §4.4).
//!
//! Grounded in this crate's prompt-construction idiom already used by
//! `LlmGateway::summarize`/`extract_keywords` (templated strings assembled
//! with `format!`) and validated the way `llm/manager.rs` normalizes
//! provider responses — here against a declared per-document-type schema
//! instead of a wire shape.

use crate::config::MetadataConfig;
use crate::llm::LlmGateway;
use crate::models::{AiMetadata, DocumentType, FileMetadata};
use serde_json::Value;
use tracing::warn;

/// One declared field in a document-type schema.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: &'static str,
    pub required: bool,
    /// If `Some`, the field's string value must be one of these.
    pub enum_values: Option<&'static [&'static str]>,
    /// If `Some`, the field must be a JSON array with at most this many
    /// elements.
    pub max_array_len: Option<usize>,
}

impl SchemaField {
    const fn required(name: &'static str) -> Self {
        Self { name, required: true, enum_values: None, max_array_len: None }
    }

    const fn optional(name: &'static str) -> Self {
        Self { name, required: false, enum_values: None, max_array_len: None }
    }

    const fn with_enum(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = Some(values);
        self
    }

    const fn with_max_len(mut self, n: usize) -> Self {
        self.max_array_len = Some(n);
        self
    }
}

const CLASSIFICATION_VALUES: &[&str] =
    &["technical", "business", "personal", "reference", "creative", "other"];

/// A media-type-specific schema: declared fields plus which are required
/// (spec.md §4.4 table).
pub struct MetadataSchema {
    pub document_type: DocumentType,
    pub fields: Vec<SchemaField>,
}

fn text_schema() -> MetadataSchema {
    MetadataSchema {
        document_type: DocumentType::Text,
        fields: vec![
            SchemaField::required("summary"),
            SchemaField::required("keywords").with_max_len(20),
            SchemaField::required("classification").with_enum(CLASSIFICATION_VALUES),
        ],
    }
}

fn image_schema() -> MetadataSchema {
    MetadataSchema {
        document_type: DocumentType::Image,
        fields: vec![
            SchemaField::required("description"),
            SchemaField::required("summary"),
            SchemaField::required("scene_type"),
            SchemaField::required("classification").with_enum(CLASSIFICATION_VALUES),
            SchemaField::optional("keywords").with_max_len(20),
        ],
    }
}

fn audio_schema() -> MetadataSchema {
    MetadataSchema {
        document_type: DocumentType::Audio,
        fields: vec![
            SchemaField::required("summary"),
            SchemaField::required("content_type"),
            SchemaField::required("classification").with_enum(CLASSIFICATION_VALUES),
            SchemaField::optional("keywords").with_max_len(20),
        ],
    }
}

fn pdf_schema() -> MetadataSchema {
    MetadataSchema {
        document_type: DocumentType::Pdf,
        fields: vec![
            SchemaField::required("summary"),
            SchemaField::required("document_type"),
            SchemaField::required("classification").with_enum(CLASSIFICATION_VALUES),
            SchemaField::optional("keywords").with_max_len(20),
        ],
    }
}

fn mixed_schema() -> MetadataSchema {
    MetadataSchema {
        document_type: DocumentType::Mixed,
        fields: vec![
            SchemaField::required("summary"),
            SchemaField::required("content_types").with_max_len(10),
            SchemaField::required("primary_content_type"),
            SchemaField::required("classification").with_enum(CLASSIFICATION_VALUES),
        ],
    }
}

/// Selects the schema for a document type. DOCX/HTML/Markdown documents
/// reuse the TEXT schema — the schema table only enumerates the five
/// distinct shapes spec.md §4.4 names, not every `DocumentType` variant.
fn schema_for(document_type: DocumentType) -> MetadataSchema {
    match document_type {
        DocumentType::Text | DocumentType::Docx | DocumentType::Html | DocumentType::Markdown => {
            text_schema()
        }
        DocumentType::Image => image_schema(),
        DocumentType::Audio => audio_schema(),
        DocumentType::Pdf => pdf_schema(),
        DocumentType::Mixed => mixed_schema(),
    }
}

/// A dropped-field or missing-required-field diagnostic recorded at `warn`,
/// never surfaced as an error (spec.md §4.4: "recorded in logs but do not
/// discard valid fields").
#[derive(Debug, Clone)]
pub enum ValidationWarning {
    UnknownField(String),
    InvalidEnumValue { field: String, value: String },
    ArrayTooLong { field: String, max: usize },
    MissingRequired(String),
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::UnknownField(name) => write!(f, "unknown field: {name}"),
            ValidationWarning::InvalidEnumValue { field, value } => {
                write!(f, "invalid value {value:?} for field {field}")
            }
            ValidationWarning::ArrayTooLong { field, max } => {
                write!(f, "field {field} exceeds max length {max}")
            }
            ValidationWarning::MissingRequired(name) => write!(f, "missing required field: {name}"),
        }
    }
}

impl MetadataSchema {
    /// Validates `candidate` against this schema: drops unknown/invalid
    /// fields (producing a warning for each) and keeps everything else,
    /// including fields that are valid but not required.
    pub fn validate(&self, candidate: &Value) -> (AiMetadata, Vec<ValidationWarning>) {
        let mut kept = AiMetadata::new();
        let mut warnings = Vec::new();

        let obj = match candidate.as_object() {
            Some(o) => o,
            None => {
                warnings.push(ValidationWarning::UnknownField(
                    "<non-object response>".to_string(),
                ));
                return (kept, warnings);
            }
        };

        for (key, value) in obj {
            match self.fields.iter().find(|f| f.name == key) {
                None => warnings.push(ValidationWarning::UnknownField(key.clone())),
                Some(field) => {
                    if let Some(enum_values) = field.enum_values {
                        if let Some(s) = value.as_str() {
                            if !enum_values.contains(&s) {
                                warnings.push(ValidationWarning::InvalidEnumValue {
                                    field: key.clone(),
                                    value: s.to_string(),
                                });
                                continue;
                            }
                        }
                    }
                    if let Some(max_len) = field.max_array_len {
                        if let Some(arr) = value.as_array() {
                            if arr.len() > max_len {
                                warnings.push(ValidationWarning::ArrayTooLong {
                                    field: key.clone(),
                                    max: max_len,
                                });
                                continue;
                            }
                        }
                    }
                    kept.insert(key.clone(), value.clone());
                }
            }
        }

        for field in &self.fields {
            if field.required && !kept.contains_key(field.name) {
                warnings.push(ValidationWarning::MissingRequired(field.name.to_string()));
            }
        }

        (kept, warnings)
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name).collect()
    }
}

/// Builds per-schema prompts and merges validated LLM output over existing
/// document metadata.
pub struct MetadataGenerator<'a> {
    gateway: &'a LlmGateway,
    config: MetadataConfig,
}

impl<'a> MetadataGenerator<'a> {
    pub fn new(gateway: &'a LlmGateway, config: MetadataConfig) -> Self {
        Self { gateway, config }
    }

    /// True when `existing` already carries every field `document_type`'s
    /// schema requires — generation is then a no-op (spec.md §4.5 job 2).
    pub fn already_satisfied(document_type: DocumentType, existing: &AiMetadata) -> bool {
        schema_for(document_type)
            .required_fields()
            .iter()
            .all(|f| existing.contains_key(*f))
    }

    /// Generates metadata for `content` and merges it over `existing`
    /// (caller-set values win per spec.md §4.4).
    pub async fn generate(
        &self,
        document_type: DocumentType,
        content: &str,
        file_metadata: &FileMetadata,
        existing: &AiMetadata,
    ) -> AiMetadata {
        let schema = schema_for(document_type);
        let prompt = self.build_prompt(&schema, document_type, content, file_metadata);

        let response = match self
            .gateway
            .generate(&[
                crate::llm::system_message(format!(
                    "{} Respond with a single JSON object containing exactly the requested \
                     fields, nothing else.",
                    crate::llm::METADATA_MARKER
                )),
                crate::llm::user_message(prompt),
            ])
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("metadata generation call failed, leaving existing metadata: {e}");
                return existing.clone();
            }
        };

        let candidate: Value = match extract_json_object(&response.text) {
            Some(v) => v,
            None => {
                warn!("metadata generation produced non-JSON output, leaving existing metadata");
                return existing.clone();
            }
        };

        let (generated, warnings) = schema.validate(&candidate);
        for warning in &warnings {
            warn!("metadata validation: {warning}");
        }

        // Merge: caller-set (existing) values win over freshly generated ones.
        let mut merged = generated;
        for (k, v) in existing {
            merged.insert(k.clone(), v.clone());
        }

        if let Some(Value::String(summary)) = merged.get_mut("summary") {
            let max = self.gateway.summary_max_length();
            if summary.chars().count() > max {
                *summary = summary.chars().take(max).collect();
            }
        }

        merged
    }

    fn build_prompt(
        &self,
        schema: &MetadataSchema,
        document_type: DocumentType,
        content: &str,
        file_metadata: &FileMetadata,
    ) -> String {
        let preview: String = content.chars().take(self.config.content_preview_chars).collect();
        let fields: Vec<&str> = schema.fields.iter().map(|f| f.name).collect();

        let mut prompt = format!(
            "Document type: {document_type}\nRequested fields: {}\n\nContent preview:\n{preview}",
            fields.join(", ")
        );

        if matches!(document_type, DocumentType::Pdf | DocumentType::Image | DocumentType::Audio)
            && !file_metadata.is_empty()
        {
            prompt.push_str("\n\nFile metadata:\n");
            for (k, v) in file_metadata {
                prompt.push_str(&format!("- {k}: {v}\n"));
            }
        }

        prompt
    }
}

/// Pulls the first balanced `{...}` JSON object out of an LLM response,
/// tolerating surrounding prose or code fences.
fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + i + c.len_utf8()];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_schema_requires_summary_keywords_classification() {
        let schema = text_schema();
        assert_eq!(schema.required_fields(), vec!["summary", "keywords", "classification"]);
    }

    #[test]
    fn test_validate_drops_unknown_field_keeps_valid_ones() {
        let schema = text_schema();
        let candidate = serde_json::json!({
            "summary": "a summary",
            "keywords": ["a", "b"],
            "classification": "technical",
            "bogus_field": 42,
        });
        let (kept, warnings) = schema.validate(&candidate);
        assert_eq!(kept.len(), 3);
        assert!(!kept.contains_key("bogus_field"));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ValidationWarning::UnknownField(_)));
    }

    #[test]
    fn test_validate_rejects_invalid_enum_value() {
        let schema = text_schema();
        let candidate = serde_json::json!({
            "summary": "s",
            "keywords": [],
            "classification": "not-a-real-classification",
        });
        let (kept, warnings) = schema.validate(&candidate);
        assert!(!kept.contains_key("classification"));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::InvalidEnumValue { .. })));
        // missing required field recorded too since it was dropped
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::MissingRequired(f) if f == "classification")));
    }

    #[test]
    fn test_validate_reports_missing_required_but_keeps_rest() {
        let schema = text_schema();
        let candidate = serde_json::json!({ "summary": "s" });
        let (kept, warnings) = schema.validate(&candidate);
        assert_eq!(kept.get("summary").and_then(|v| v.as_str()), Some("s"));
        assert_eq!(warnings.len(), 2); // missing keywords, classification
    }

    #[test]
    fn test_already_satisfied_true_when_required_keys_present() {
        let mut existing = AiMetadata::new();
        existing.insert("summary".to_string(), "s".into());
        existing.insert("keywords".to_string(), serde_json::json!([]));
        existing.insert("classification".to_string(), "technical".into());
        assert!(MetadataGenerator::already_satisfied(DocumentType::Text, &existing));
    }

    #[test]
    fn test_already_satisfied_false_when_missing_key() {
        let existing = AiMetadata::new();
        assert!(!MetadataGenerator::already_satisfied(DocumentType::Text, &existing));
    }

    #[test]
    fn test_extract_json_object_ignores_surrounding_prose() {
        let text = "Sure, here you go:\n```json\n{\"summary\": \"s\"}\n```\nHope that helps!";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["summary"], "s");
    }

    #[test]
    fn test_existing_metadata_wins_on_merge_conflict() {
        // Merge direction is tested at the integration level (MetadataGenerator::generate);
        // this documents the precedence rule keeping caller-set values.
        let mut existing = AiMetadata::new();
        existing.insert("summary".to_string(), "caller summary".into());
        let mut generated = AiMetadata::new();
        generated.insert("summary".to_string(), "llm summary".into());
        let mut merged = generated;
        for (k, v) in &existing {
            merged.insert(k.clone(), v.clone());
        }
        assert_eq!(merged.get("summary").unwrap(), "caller summary");
    }

    #[tokio::test]
    async fn test_generate_in_fallback_mode_produces_nonempty_bounded_summary() {
        let mut llm_config = crate::config::LlmConfig::default();
        llm_config.default_provider = "nonexistent".to_string();
        llm_config.summary_max_length = 40;
        let gateway = LlmGateway::new(&llm_config).unwrap();

        let generator = MetadataGenerator::new(&gateway, MetadataConfig::default());
        let content = "First sentence. Second sentence. Third sentence. Fourth sentence. \
             Fifth sentence talks at length about many things to pad this out well beyond \
             forty characters so truncation is actually exercised.";
        let merged = generator
            .generate(DocumentType::Text, content, &FileMetadata::new(), &AiMetadata::new())
            .await;

        let summary = merged.get("summary").and_then(|v| v.as_str()).unwrap();
        assert!(!summary.is_empty());
        assert!(summary.chars().count() <= 40);
        assert_eq!(merged.get("classification").and_then(|v| v.as_str()), Some("other"));
    }
}
