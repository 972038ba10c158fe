//! S3 backend
//!
//! Wraps `aws-sdk-s3` behind the `ObjectStore` contract. The client is
//! built from an explicit `StoreConfig`; there is no ambient global, and
//! missing credentials only surface at the first call, not at construction.

use super::{ObjectInfo, ObjectStore, StoreError};
use crate::config::StoreConfig;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// S3-compatible object store (AWS S3, MinIO, R2 via endpoint override).
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the given configuration.
    ///
    /// Static credentials from the config take precedence; otherwise the
    /// SDK's default provider chain applies (env, profile, IMDS).
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "spokhand-config",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        tracing::info!(
            "object store client ready: bucket={} region={}",
            config.bucket,
            config.region
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an S3 service error code onto the store taxonomy.
fn classify_code(code: &str, detail: String) -> StoreError {
    match code {
        "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken" => {
            StoreError::Auth(detail)
        }
        "NoSuchBucket" => StoreError::MissingBucket(detail),
        "NoSuchKey" | "NotFound" => StoreError::NotFound(detail),
        "SlowDown" | "RequestTimeout" | "InternalError" | "ServiceUnavailable" => {
            StoreError::Throttled(detail)
        }
        _ => StoreError::Other(detail),
    }
}

/// Convert any SDK failure at the boundary; raw SDK errors never cross
/// into the core contract.
fn classify<E, R>(action: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            return StoreError::Network(format!("{action}: {err}"));
        }
        _ => {}
    }

    let code = err.code().unwrap_or("").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    classify_code(&code, format!("{action}: {code}: {message}"))
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()).unwrap_or_else(Utc::now)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| StoreError::Other(format!("read {}: {e}", local.display())))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| classify("put_object", e))?;

        tracing::debug!("stored s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify("put_object", e))?;

        tracing::debug!("stored s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("get_object", e))?;

        let data = out
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Network(format!("get_object body: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>, StoreError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys.min(i32::MAX as usize) as i32)
            .send()
            .await
            .map_err(|e| classify("list_objects_v2", e))?;

        let mut items = Vec::new();
        for obj in out.contents() {
            let Some(key) = obj.key() else { continue };
            items.push(ObjectInfo {
                key: key.to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                last_modified: obj.last_modified().map(to_chrono).unwrap_or_else(Utc::now),
            });
        }
        Ok(items)
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| StoreError::Other(format!("presign config: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| classify("presign get_object", e))?;

        Ok(request.uri().to_string())
    }
}
