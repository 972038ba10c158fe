//! Post-upload processing hook
//!
//! Stateless function over stored-object notifications: read the object,
//! write a JSON sidecar under the `metadata/` namespace, report a status
//! code and message. Nothing is carried between invocations.

use crate::store::ObjectStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One stored-object notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNotification {
    pub bucket: String,
    pub key: String,
}

/// Outcome of a processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub status_code: u16,
    pub message: String,
}

/// Sidecar written next to each processed object. Field names are the
/// wire format consumed downstream; do not rename.
#[derive(Debug, Serialize, Deserialize)]
struct SidecarMetadata {
    filename: String,
    processed_at: String,
    status: String,
}

/// Process a batch of notifications against `store`.
///
/// Records for buckets other than `bucket_name` are skipped. For each
/// matching record the object is read back and a
/// `metadata/{key}.json` sidecar is written. The first failure aborts the
/// batch with a 500.
pub async fn process_notifications(
    store: &dyn ObjectStore,
    bucket_name: &str,
    notifications: &[ObjectNotification],
) -> ProcessingOutcome {
    for record in notifications {
        if record.bucket != bucket_name {
            tracing::debug!(
                "skipping notification for foreign bucket {} (key {})",
                record.bucket,
                record.key
            );
            continue;
        }

        let body = match store.get(&record.key).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("error processing {}: {e}", record.key);
                return ProcessingOutcome {
                    status_code: 500,
                    message: format!("Error: {e}"),
                };
            }
        };
        tracing::info!("processing file: {} ({} bytes)", record.key, body.len());

        let metadata = SidecarMetadata {
            filename: record.key.clone(),
            processed_at: Utc::now().to_rfc3339(),
            status: String::from("processed"),
        };
        let payload = match serde_json::to_vec(&metadata) {
            Ok(payload) => payload,
            Err(e) => {
                return ProcessingOutcome {
                    status_code: 500,
                    message: format!("Error: {e}"),
                }
            }
        };

        let sidecar_key = format!("metadata/{}.json", record.key);
        if let Err(e) = store.put_bytes(payload, &sidecar_key).await {
            tracing::error!("error writing sidecar {sidecar_key}: {e}");
            return ProcessingOutcome {
                status_code: 500,
                message: format!("Error: {e}"),
            };
        }
    }

    ProcessingOutcome {
        status_code: 200,
        message: String::from("Processing completed successfully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;

    #[tokio::test]
    async fn test_sidecar_written_for_matching_bucket() {
        let store = MemoryObjectStore::new();
        store
            .put_bytes(b"video".to_vec(), "oak_videos/clip.mp4")
            .await
            .unwrap();

        let outcome = process_notifications(
            &store,
            "spokhand-data",
            &[ObjectNotification {
                bucket: "spokhand-data".to_string(),
                key: "oak_videos/clip.mp4".to_string(),
            }],
        )
        .await;

        assert_eq!(outcome.status_code, 200);
        let sidecar = store.get("metadata/oak_videos/clip.mp4.json").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&sidecar).unwrap();
        assert_eq!(parsed["filename"], "oak_videos/clip.mp4");
        assert_eq!(parsed["status"], "processed");
        assert!(parsed["processed_at"].is_string());
    }

    #[tokio::test]
    async fn test_foreign_bucket_skipped() {
        let store = MemoryObjectStore::new();

        let outcome = process_notifications(
            &store,
            "spokhand-data",
            &[ObjectNotification {
                bucket: "someone-elses-bucket".to_string(),
                key: "oak_videos/clip.mp4".to_string(),
            }],
        )
        .await;

        assert_eq!(outcome.status_code, 200);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_object_reports_500() {
        let store = MemoryObjectStore::new();

        let outcome = process_notifications(
            &store,
            "spokhand-data",
            &[ObjectNotification {
                bucket: "spokhand-data".to_string(),
                key: "oak_videos/ghost.mp4".to_string(),
            }],
        )
        .await;

        assert_eq!(outcome.status_code, 500);
        assert!(outcome.message.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let store = MemoryObjectStore::new();
        let outcome = process_notifications(&store, "spokhand-data", &[]).await;
        assert_eq!(outcome.status_code, 200);
    }
}
