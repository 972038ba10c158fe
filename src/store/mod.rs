//! Object storage
//!
//! Capability-object abstraction over a durable key-addressed store. The
//! pipeline depends on this trait only; backends classify their failures as
//! retryable or fatal and never leak SDK error types into the core.

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Remote store failures, pre-classified at the SDK boundary
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object store throttled the request: {0}")]
    Throttled(String),

    #[error("network failure reaching object store: {0}")]
    Network(String),

    #[error("object store rejected credentials: {0}")]
    Auth(String),

    #[error("bucket not found: {0}")]
    MissingBucket(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store request failed: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether a caller with a retry policy could reasonably try again.
    /// The pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Network(_))
    }
}

/// Metadata for one stored object, as enumerated by `list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Durable key-addressed storage service.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a local file under `key`.
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError>;

    /// Persist an in-memory buffer under `key`.
    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<(), StoreError>;

    /// Read back the object at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Enumerate up to `max_keys` objects under `prefix`, in whatever order
    /// the backend yields them.
    async fn list(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>, StoreError>;

    /// Produce a time-bounded, shareable read URL for `key`.
    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;
}
