//! End-to-end pipeline tests: record to a local file, upload it, confirm
//! the local temporary is gone and the remote side holds exactly what we
//! expect. The in-memory store stands in for S3.

use spokhand_capture::recorder::Encoder;
use spokhand_capture::{
    Frame, MemoryObjectStore, ObjectStore, Recorder, RecorderSettings, RecordingError, StoreError,
    UploadError, UploadPipeline,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// File-backed test encoder: an 8-byte header plus length-prefixed frames.
struct SegmentFileEncoder {
    file: fs::File,
}

impl SegmentFileEncoder {
    fn create(path: &Path) -> Self {
        let mut file = fs::File::create(path).unwrap();
        file.write_all(b"SPKV0001").unwrap();
        Self { file }
    }
}

impl Encoder for SegmentFileEncoder {
    fn append(&mut self, rgb: &[u8]) -> Result<(), RecordingError> {
        self.file.write_all(&(rgb.len() as u32).to_le_bytes())?;
        self.file.write_all(rgb)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), RecordingError> {
        let mut file = self.file;
        file.flush()?;
        Ok(())
    }
}

fn vga_frame() -> Frame {
    Frame::new(640, 480, vec![128u8; 640 * 480 * 3])
}

fn pipeline_over(store: &Arc<MemoryObjectStore>) -> UploadPipeline {
    UploadPipeline::new(store.clone(), Duration::from_secs(3600))
}

#[tokio::test]
async fn record_three_frames_then_upload() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");

    let mut recorder = Recorder::new(RecorderSettings::default());
    recorder
        .start_with_encoder(clip.clone(), Box::new(SegmentFileEncoder::create(&clip)))
        .unwrap();
    for _ in 0..3 {
        recorder.append_frame(&vga_frame()).unwrap();
    }
    let completed = recorder.stop().unwrap().expect("completed file");
    assert_eq!(completed.frame_count, 3);
    assert!(completed.size_bytes > 0);

    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = pipeline_over(&store);
    let record = pipeline
        .upload_file(&completed.path, "oak_videos")
        .await
        .unwrap();

    // Exactly one remote object, zero local files remaining.
    assert_eq!(store.len(), 1);
    assert!(store.contains_key(&record.key));
    assert!(!completed.path.exists());
    assert!(record.size_bytes > 0);
    assert!(record.key.starts_with("oak_videos/"));
    assert!(record.key.ends_with("_clip.mp4"));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn failed_upload_still_removes_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let staged = dir.path().join("clip.mp4");
    fs::write(&staged, b"payload").unwrap();

    let store = Arc::new(MemoryObjectStore::new());
    store.fail_next_put(StoreError::Auth("bad credentials".into()));
    let pipeline = pipeline_over(&store);

    let err = pipeline.upload_file(&staged, "oak_videos").await.unwrap_err();
    match err {
        UploadError::Store {
            source, cleanup, ..
        } => {
            assert!(!source.is_retryable());
            assert_eq!(cleanup, spokhand_capture::CleanupOutcome::Removed);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Deleted exactly once, on the failure path too.
    assert!(!staged.exists());
    assert!(store.is_empty());
}

#[tokio::test]
async fn upload_of_missing_file_reports_missing_source() {
    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = pipeline_over(&store);

    let err = pipeline
        .upload_file(Path::new("nonexistent/clip.mp4"), "oak_videos")
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::MissingSource(_)));
}

#[tokio::test]
async fn stage_then_upload_buffer_flow() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = pipeline_over(&store);

    let staged = pipeline
        .stage_buffer(&dir.path().join("staging"), "user-clip.mp4", b"user bytes")
        .unwrap();
    assert!(staged.exists());

    let record = pipeline.upload_file(&staged, "oak_videos").await.unwrap();
    assert!(!staged.exists());
    assert_eq!(record.size_bytes, 10);
}

#[tokio::test]
async fn upload_buffer_goes_direct() {
    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = pipeline_over(&store);

    let record = pipeline
        .upload_buffer(b"direct".to_vec(), "oak_videos/direct.bin")
        .await
        .unwrap();
    assert_eq!(record.key, "oak_videos/direct.bin");
    assert_eq!(store.get("oak_videos/direct.bin").await.unwrap(), b"direct");
}

#[tokio::test]
async fn list_recent_caps_at_limit_and_presigns() {
    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = pipeline_over(&store);

    for i in 0..8 {
        pipeline
            .upload_buffer(vec![0u8; 16], &format!("oak_videos/clip{i}.mp4"))
            .await
            .unwrap();
    }

    let records = pipeline.list_recent("oak_videos/", 5).await.unwrap();
    assert_eq!(records.len(), 5);
    for record in &records {
        assert!(record.url.as_deref().unwrap().starts_with("memory://"));
        assert_eq!(record.size_bytes, 16);
    }
}
