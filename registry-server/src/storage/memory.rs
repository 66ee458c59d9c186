//! In-process object store.

use super::{check_key, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Object store keeping everything in a map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        check_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{}/{}", self.bucket, key))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut objects = self.objects.write().await;
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));
        Ok(before - objects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryObjectStore::new("registry");
        let location = store
            .put_object("packages/a", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        assert_eq!(location, "memory://registry/packages/a");

        let object = store.get("packages/a").await.unwrap();
        assert_eq!(object.content_type, "application/json");
        assert_eq!(&object.body[..], b"{}");

        store.delete_object("packages/a").await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.delete_object("packages/a").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_prefix() {
        let store = MemoryObjectStore::new("registry");
        for key in ["packages/a", "packages/b", "audit/c"] {
            store
                .put_object(key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }

        assert_eq!(store.delete_prefix("packages/").await.unwrap(), 2);
        assert_eq!(store.keys().await, vec!["audit/c".to_string()]);
    }
}
