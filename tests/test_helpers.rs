//! Test helpers and utilities for the ragdoll_core test suite

use ragdoll_core::{RagClientBuilder, RagConfig, StorageConfig};
use tempfile::TempDir;

/// Creates a temporary directory for test artifacts
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Creates a test configuration backed by an in-memory store.
pub fn create_test_config() -> RagConfig {
    RagConfig {
        storage: StorageConfig { store_type: "memory".to_string(), database_url: None },
        ..RagConfig::default()
    }
}

/// Creates a test configuration backed by a file-based SQLite database.
pub fn create_test_config_with_file(temp_dir: &TempDir) -> RagConfig {
    let db_path = temp_dir.path().join("test.db");
    RagConfig {
        storage: StorageConfig {
            store_type: "sqlite".to_string(),
            database_url: Some(format!("sqlite://{}", db_path.to_str().unwrap())),
        },
        ..RagConfig::default()
    }
}

/// Builds a client against an in-memory store for tests that don't care
/// about persistence.
pub async fn build_memory_client() -> ragdoll_core::RagClient {
    RagClientBuilder::new()
        .with_config(create_test_config())
        .build()
        .await
        .expect("failed to build test client")
}

/// Checks if a specific provider's API key is set in the environment.
pub fn has_api_key(provider: &str) -> bool {
    match provider {
        "openai" => std::env::var("OPENAI_API_KEY").is_ok(),
        "anthropic" => std::env::var("ANTHROPIC_API_KEY").is_ok(),
        "google" => std::env::var("GOOGLE_API_KEY").is_ok(),
        "groq" => std::env::var("GROQ_API_KEY").is_ok(),
        "together" => std::env::var("TOGETHER_API_KEY").is_ok(),
        "azure" => {
            std::env::var("AZURE_OPENAI_API_KEY").is_ok()
                && std::env::var("AZURE_OPENAI_ENDPOINT").is_ok()
        }
        _ => false,
    }
}

/// Waits for a condition to be true with timeout.
pub async fn wait_for_condition<F>(mut condition: F, timeout_secs: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_config() {
        let config = create_test_config();
        assert_eq!(config.storage.store_type, "memory");
    }

    #[test]
    fn test_create_test_dir() {
        let dir = create_test_dir();
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_wait_for_condition() {
        let mut counter = 0;
        let result = wait_for_condition(
            || {
                counter += 1;
                counter >= 3
            },
            1,
        )
        .await;
        assert!(result);
        assert!(counter >= 3);
    }

    #[tokio::test]
    async fn test_build_memory_client_is_healthy() {
        let client = build_memory_client().await;
        assert!(client.healthy().await);
    }
}
