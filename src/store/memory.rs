//! In-memory backend
//!
//! Conforms to the `ObjectStore` contract without external services. Used
//! by tests and offline runs; failure injection covers the pipeline's
//! cleanup-on-error paths.

use super::{ObjectInfo, ObjectStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Key-ordered in-memory object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    pending_failure: Mutex<Option<StoreError>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next put fail with `err`.
    pub fn fail_next_put(&self, err: StoreError) {
        *self.pending_failure.lock() = Some(err);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }

    fn insert(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        if let Some(err) = self.pending_failure.lock().take() {
            return Err(err);
        }
        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        let data = std::fs::read(local)
            .map_err(|e| StoreError::Other(format!("read {}: {e}", local.display())))?;
        self.insert(key, data)
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<(), StoreError> {
        self.insert(key, data)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>, StoreError> {
        Ok(self
            .objects
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(max_keys)
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: obj.last_modified,
            })
            .collect())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        if !self.contains_key(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{key}?expires={}", ttl.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryObjectStore::new();
        store.put_bytes(b"abc".to_vec(), "videos/a.mp4").await.unwrap();
        assert_eq!(store.get("videos/a.mp4").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let store = MemoryObjectStore::new();
        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_respects_prefix_and_limit() {
        let store = MemoryObjectStore::new();
        for i in 0..7 {
            store
                .put_bytes(vec![0u8; i + 1], &format!("videos/clip{i}.mp4"))
                .await
                .unwrap();
        }
        store.put_bytes(vec![1], "metadata/x.json").await.unwrap();

        let listed = store.list("videos/", 5).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|o| o.key.starts_with("videos/")));
    }

    #[tokio::test]
    async fn test_presign_requires_existing_object() {
        let store = MemoryObjectStore::new();
        store.put_bytes(vec![1], "videos/a.mp4").await.unwrap();

        let url = store
            .presign("videos/a.mp4", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.contains("expires=3600"));
        assert!(store
            .presign("videos/missing.mp4", Duration::from_secs(60))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryObjectStore::new();
        store.fail_next_put(StoreError::Throttled("slow down".into()));

        assert!(store.put_bytes(vec![1], "a").await.is_err());
        assert!(store.put_bytes(vec![1], "a").await.is_ok());
    }
}
