//! # Object Storage
//!
//! Package payloads are persisted as single objects under a namespaced key
//! (`packages/<id>` by default) in one configured bucket. Handlers only see
//! the [`ObjectStore`] trait; the concrete backend is chosen from
//! configuration at startup and injected through [`crate::state::AppState`].
//!
//! ## Backends
//!
//! - [`S3ObjectStore`]: S3 REST API with AWS Signature V4 request signing
//! - [`LocalObjectStore`]: files under a data directory, for development
//! - [`MemoryObjectStore`]: an in-process map, for tests and throwaway runs
//!
//! No backend retries a failed call. Callers that need resilience must add
//! it themselves.

pub mod local;
pub mod memory;
pub mod s3;
pub mod sigv4;

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

pub use local::LocalObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};
pub use s3::S3ObjectStore;
pub use sigv4::S3Credentials;

/// Errors raised by object store backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Object store returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Object store misconfigured: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Blob storage used by the registry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Store `body` under `key`, replacing any existing object, and return
    /// the object's location.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> StorageResult<String>;

    async fn object_exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete one object. Deleting a missing object is not an error for
    /// every backend; check [`ObjectStore::object_exists`] first when the
    /// difference matters.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Delete every object whose key starts with `prefix` and return how many
    /// were removed.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize>;
}

/// Build the key a package file is stored under: `<prefix>/<file_name>`.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_matches('/'), file_name)
}

/// The listing prefix covering every key produced by [`object_key`].
pub fn key_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_matches('/'))
}

/// Reject keys that could escape the store's namespace.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\0')
        || key.contains('\\')
        || key.split('/').any(|segment| segment == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Create the object store selected by `config`.
pub fn build_object_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::S3 => {
            let credentials = S3Credentials::from_env()?;
            Arc::new(S3ObjectStore::new(
                &config.bucket,
                &config.region,
                config.endpoint.as_deref(),
                credentials,
            )?)
        }
        StorageBackend::Local => Arc::new(LocalObjectStore::new(&config.data_dir)),
        StorageBackend::Memory => Arc::new(MemoryObjectStore::new(&config.bucket)),
    };

    info!(backend = store.name(), bucket = %config.bucket, "Object store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_is_deterministic() {
        assert_eq!(object_key("packages", "abc"), "packages/abc");
        assert_eq!(object_key("packages/", "abc"), "packages/abc");
        assert_eq!(object_key("/packages/", "abc"), "packages/abc");
        assert_eq!(key_prefix("packages"), "packages/");
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("packages/abc").is_ok());

        assert!(check_key("").is_err());
        assert!(check_key("/etc/passwd").is_err());
        assert!(check_key("packages/../secrets").is_err());
        assert!(check_key("packages\\abc").is_err());
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let store = build_object_store(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
