//! Store and pipeline configuration
//!
//! One explicit struct, constructed at process start and handed to the
//! store by reference. Environment variables are read in `from_env` only;
//! nothing here touches the network, so missing credentials surface at the
//! first store call rather than at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the object store and local working directories
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// AWS region
    pub region: String,

    /// Bucket name
    pub bucket: String,

    /// S3-compatible endpoint override (None for AWS S3)
    pub endpoint_url: Option<String>,

    /// Static access key (None = SDK default provider chain)
    pub access_key_id: Option<String>,

    /// Static secret key
    pub secret_access_key: Option<String>,

    /// Lifetime of presigned preview URLs
    pub presign_ttl: Duration,

    /// Key prefix for camera recordings
    pub video_prefix: String,

    /// Working directory for in-progress recordings
    pub recording_dir: PathBuf,

    /// Working directory for files staged before upload
    pub staging_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: String::from("us-east-1"),
            bucket: String::from("spokhand-data"),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            presign_ttl: Duration::from_secs(3600),
            video_prefix: String::from("oak_videos"),
            recording_dir: PathBuf::from("temp_recordings"),
            staging_dir: PathBuf::from("temp_uploads"),
        }
    }
}

impl StoreConfig {
    /// Config for a named AWS S3 bucket.
    pub fn s3(bucket: &str, region: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            region: region.to_string(),
            ..Default::default()
        }
    }

    /// Read configuration from the environment, falling back to defaults:
    /// `AWS_REGION` (us-east-1), `S3_BUCKET_NAME` (spokhand-data),
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (unset = provider
    /// chain), `S3_ENDPOINT_URL` (unset = AWS).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            region: env::var("AWS_REGION").unwrap_or(defaults.region),
            bucket: env::var("S3_BUCKET_NAME").unwrap_or(defaults.bucket),
            endpoint_url: env::var("S3_ENDPOINT_URL").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.bucket, "spokhand-data");
        assert_eq!(config.presign_ttl, Duration::from_secs(3600));
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    fn test_s3_constructor() {
        let config = StoreConfig::s3("my-bucket", "eu-west-1");
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.video_prefix, "oak_videos");
    }
}
