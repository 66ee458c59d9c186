//! Common test utilities and helpers
//!
//! Fake collaborators for [`AppState`] and a builder for an axum-test
//! server around the real router.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use registry_server::config::{Config, StorageBackend};
use registry_server::debloat::{JsMinifier, Minifier, MinifyError};
use registry_server::storage::{MemoryObjectStore, ObjectStore, StorageError, StorageResult};
use registry_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded `put_object` call.
#[derive(Debug, Clone)]
pub struct PutCall {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

/// Memory store that records every call it receives.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryObjectStore,
    puts: Mutex<Vec<PutCall>>,
    calls: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new("test-bucket"),
            ..Default::default()
        }
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    /// Total number of store calls of any kind
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryObjectStore {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.puts.lock().unwrap().push(PutCall {
            key: key.to_string(),
            body: body.clone(),
            content_type: content_type.to_string(),
        });
        self.inner.put_object(key, body, content_type).await
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.object_exists(key).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_object(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_prefix(prefix).await
    }
}

/// Store whose every call fails as if the backend were unreachable.
pub struct FailingStore;

fn unreachable_backend() -> StorageError {
    StorageError::Rejected {
        status: 500,
        message: "InternalError".to_string(),
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn put_object(&self, _: &str, _: Bytes, _: &str) -> StorageResult<String> {
        Err(unreachable_backend())
    }

    async fn object_exists(&self, _: &str) -> StorageResult<bool> {
        Err(unreachable_backend())
    }

    async fn delete_object(&self, _: &str) -> StorageResult<()> {
        Err(unreachable_backend())
    }

    async fn delete_prefix(&self, _: &str) -> StorageResult<usize> {
        Err(unreachable_backend())
    }
}

/// Minifier that always fails.
pub struct FailingMinifier;

impl Minifier for FailingMinifier {
    fn minify(&self, _source: &str) -> Result<String, MinifyError> {
        Err(MinifyError::Other("boom".to_string()))
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.storage.bucket = "test-bucket".to_string();
    config
}

pub fn test_server_with(
    config: Config,
    store: Arc<dyn ObjectStore>,
    minifier: Arc<dyn Minifier>,
) -> TestServer {
    let state = AppState::new(config, store, minifier);
    TestServer::new(build_router(Arc::new(state))).unwrap()
}

/// Server over a [`RecordingStore`] and the built-in minifier.
pub fn recording_server() -> (TestServer, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new());
    let server = test_server_with(test_config(), store.clone(), Arc::new(JsMinifier));
    (server, store)
}

pub fn lodash_metadata() -> Value {
    json!({ "Name": "lodash", "Version": "4.17.21", "ID": "lodash" })
}
