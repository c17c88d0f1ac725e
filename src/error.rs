//! Error handling for the RAG core

use thiserror::Error;

/// Result type alias for the RAG core
pub type Result<T> = std::result::Result<T, RagError>;

/// Main error type for the RAG core
#[derive(Error, Debug)]
pub enum RagError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Chunk error: {0}")]
    Chunk(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors related to language model operations
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout: operation took too long")]
    Timeout,

    #[error("All providers failed")]
    AllProvidersFailed,

    #[error("Unauthorized: missing or invalid credential")]
    Unauthorized,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Provider server error: {0}")]
    ServerError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors related to the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Storage failed: {0}")]
    StorageFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

impl RagError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::Llm(LlmError::Timeout)
                | RagError::Llm(LlmError::ConnectionFailed(_))
                | RagError::Llm(LlmError::RateLimited)
                | RagError::Llm(LlmError::ServerError(_))
                | RagError::Http(_)
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            RagError::Llm(_) => "llm",
            RagError::Storage(_) => "storage",
            RagError::Parse(_) => "parse",
            RagError::Chunk(_) => "chunk",
            RagError::Config(_) => "config",
            RagError::Search(_) => "search",
            RagError::Document(_) => "document",
            RagError::Io(_) => "io",
            RagError::Serialization(_) => "serialization",
            RagError::Http(_) => "http",
            RagError::Database(_) => "database",
            RagError::Generic(_) => "generic",
            RagError::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let timeout_error = RagError::Llm(LlmError::Timeout);
        assert!(timeout_error.is_retryable());

        let config_error = RagError::Config("invalid config".to_string());
        assert!(!config_error.is_retryable());
    }

    #[test]
    fn test_error_category() {
        let llm_error = RagError::Llm(LlmError::Timeout);
        assert_eq!(llm_error.category(), "llm");

        let storage_error = RagError::Storage(StorageError::NotInitialized);
        assert_eq!(storage_error.category(), "storage");
    }

    #[test]
    fn test_rate_limited_retryable() {
        assert!(RagError::Llm(LlmError::RateLimited).is_retryable());
        assert!(!RagError::Llm(LlmError::Unauthorized).is_retryable());
    }
}
