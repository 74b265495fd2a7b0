//! Key-value store port - small device-local persistence.
//!
//! Holds the theme preference and, when enabled, the persisted auth refresh
//! token used to restore a session at startup.

use async_trait::async_trait;

/// Errors that can occur during key-value storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to serialize store: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize store: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// String key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
