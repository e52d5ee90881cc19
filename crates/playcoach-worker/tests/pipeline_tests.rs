//! Pipeline integration tests against mocked and fake remote services.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use playcoach_gemini::{GeminiClient, GeminiConfig, GeminiError, GeminiResult, VideoService};
use playcoach_ledger::Ledger;
use playcoach_models::{AnalysisRecord, AnalysisStatus, AssetHandle, AssetState, PromptSpec, StructuredAnalysis};
use playcoach_worker::{
    AssetUploader, PipelineError, RetryConfig, VideoOutcome, VideoProcessor, WorkerConfig,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

mock! {
    pub Service {}

    #[async_trait]
    impl VideoService for Service {
        async fn upload(&self, path: &Path, display_name: &str) -> GeminiResult<AssetHandle>;
        async fn get_status(&self, handle: &AssetHandle) -> GeminiResult<AssetHandle>;
        async fn list_existing(&self) -> GeminiResult<Vec<AssetHandle>>;
        async fn delete(&self, handle: &AssetHandle) -> GeminiResult<()>;
        async fn generate(&self, prompt: &str, handle: &AssetHandle, timeout: Duration) -> GeminiResult<String>;
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn test_config(dir: &Path) -> WorkerConfig {
    WorkerConfig {
        video_dir: dir.join("videos"),
        ledger_path: dir.join("processed_videos.json"),
        poll_interval: Duration::from_millis(1),
        max_wait: Duration::from_millis(50),
        retry: RetryConfig::none(),
        ..WorkerConfig::default()
    }
}

fn prompt() -> PromptSpec {
    PromptSpec::new("EA FC 24", None).unwrap()
}

fn handle(id: &str, display_name: &str, state: AssetState) -> AssetHandle {
    AssetHandle {
        name: format!("files/{}", id),
        display_name: display_name.to_string(),
        uri: format!("https://files.example/{}", id),
        mime_type: "video/mp4".to_string(),
        state,
    }
}

fn sample_analysis() -> StructuredAnalysis {
    serde_json::from_value(json!({
        "game": "EA FC 24",
        "key_focus_areas": ["Passing", "Positioning", "Defending", "Finishing"],
        "mistakes": [{
            "timestamp": "00:00:42",
            "description": "Pass into a crowded midfield",
            "why_incorrect": "Three defenders were closing the lane",
            "better_alternative": "Switch play to the open winger",
            "expected_benefit": "Keeps possession and stretches the defense"
        }],
        "repeated_errors": [{
            "pattern": "Sprinting with the ball under pressure",
            "occurrences": ["00:01:30", "00:04:15"],
            "fix": "Use close control and shield the ball"
        }],
        "missed_opportunities": [{
            "timestamp": "00:02:45",
            "missed_action": "Early through ball to the striker",
            "expected_outcome": "One-on-one with the keeper"
        }]
    }))
    .unwrap()
}

fn model_reply() -> String {
    format!(
        "Sure! Here is the analysis:\n```json\n{}\n```",
        serde_json::to_string_pretty(&sample_analysis()).unwrap()
    )
}

async fn open_ledger(config: &WorkerConfig) -> Arc<Ledger> {
    Arc::new(Ledger::open(&config.ledger_path).await.unwrap())
}

/// In-memory remote service. Uploads start pending and turn active on the
/// first status check.
#[derive(Default)]
struct FakeService {
    assets: Mutex<HashMap<String, AssetHandle>>,
    failing_generate: Vec<String>,
    uploads: AtomicU32,
}

impl FakeService {
    fn failing_for(display_names: &[&str]) -> Self {
        Self {
            failing_generate: display_names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl VideoService for FakeService {
    async fn upload(&self, _path: &Path, display_name: &str) -> GeminiResult<AssetHandle> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let h = handle(&format!("f{}", n), display_name, AssetState::Pending);
        self.assets.lock().unwrap().insert(h.name.clone(), h.clone());
        Ok(h)
    }

    async fn get_status(&self, handle: &AssetHandle) -> GeminiResult<AssetHandle> {
        let mut assets = self.assets.lock().unwrap();
        let asset = assets
            .get_mut(&handle.name)
            .ok_or_else(|| GeminiError::NotFound(handle.name.clone()))?;
        asset.state = AssetState::Active;
        Ok(asset.clone())
    }

    async fn list_existing(&self) -> GeminiResult<Vec<AssetHandle>> {
        Ok(self.assets.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, handle: &AssetHandle) -> GeminiResult<()> {
        self.assets.lock().unwrap().remove(&handle.name);
        Ok(())
    }

    async fn generate(&self, _prompt: &str, handle: &AssetHandle, _timeout: Duration) -> GeminiResult<String> {
        if self.failing_generate.contains(&handle.display_name) {
            return Err(GeminiError::from_http_status(400, "video could not be processed"));
        }
        Ok(model_reply())
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

#[tokio::test]
async fn test_end_to_end_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;
    let service = Arc::new(FakeService::default());
    let processor = VideoProcessor::new(service.clone(), ledger.clone(), config.clone());

    let paths = vec![config.video_dir.join("clip1.mp4")];
    let summary = processor.run(&paths, &prompt(), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(service.uploads.load(Ordering::SeqCst), 1);

    let record = ledger.get("clip1.mp4").await.unwrap().unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.analysis, Some(sample_analysis()));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.ledger_path).unwrap()).unwrap();
    let analysis = doc["clip1.mp4"]["analysis"].as_object().unwrap();
    let mut keys: Vec<_> = analysis.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["game", "key_focus_areas", "missed_opportunities", "mistakes", "repeated_errors"]
    );
}

#[tokio::test]
async fn test_partial_failure_records_both_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;
    let service = Arc::new(FakeService::failing_for(&["clip2.mp4"]));
    let processor = VideoProcessor::new(service, ledger.clone(), config.clone());

    let paths = vec![
        config.video_dir.join("clip1.mp4"),
        config.video_dir.join("clip2.mp4"),
    ];
    let summary = processor.run(&paths, &prompt(), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);

    let first = ledger.get("clip1.mp4").await.unwrap().unwrap();
    assert!(first.is_completed());

    let second = ledger.get("clip2.mp4").await.unwrap().unwrap();
    assert!(second.is_failed());
    let message = second.error.unwrap();
    assert!(message.starts_with("Analysis failed"), "{}", message);
    assert!(message.contains("video could not be processed"));
}

#[tokio::test]
async fn test_failed_record_is_retried_on_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;
    ledger
        .upsert("clip1.mp4", AnalysisRecord::failed("remote timeout"))
        .await
        .unwrap();

    let processor = VideoProcessor::new(Arc::new(FakeService::default()), ledger.clone(), config.clone());
    let summary = processor
        .run(&[config.video_dir.join("clip1.mp4")], &prompt(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert!(ledger.get("clip1.mp4").await.unwrap().unwrap().is_completed());
}

#[tokio::test]
async fn test_second_run_makes_no_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;
    ledger
        .upsert("clip1.mp4", AnalysisRecord::completed(sample_analysis()))
        .await
        .unwrap();
    ledger
        .upsert("clip2.mp4", AnalysisRecord::completed(sample_analysis()))
        .await
        .unwrap();
    let before = std::fs::read(&config.ledger_path).unwrap();

    // No expectations: any remote call panics.
    let service = MockService::new();
    let processor = VideoProcessor::new(Arc::new(service), ledger, config.clone());

    let paths = vec![
        config.video_dir.join("clip1.mp4"),
        config.video_dir.join("clip2.mp4"),
        config.video_dir.join("clip1.mp4"),
    ];
    let summary = processor.run(&paths, &prompt(), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.total(), 2);
    assert_eq!(std::fs::read(&config.ledger_path).unwrap(), before);
}

#[tokio::test]
async fn test_existing_remote_asset_skips_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    let mut service = MockService::new();
    service
        .expect_list_existing()
        .times(1)
        .returning(|| Ok(vec![handle("abc", "clip1.mp4", AssetState::Active)]));
    service.expect_upload().times(0);
    service.expect_get_status().times(0);
    service
        .expect_generate()
        .withf(|prompt, handle, timeout| {
            prompt.contains("EA FC 24")
                && handle.name == "files/abc"
                && *timeout == Duration::from_secs(600)
        })
        .times(1)
        .returning(|_, _, _| Ok(model_reply()));

    let processor = VideoProcessor::new(Arc::new(service), ledger.clone(), config.clone());
    let summary = processor
        .run(&[config.video_dir.join("clip1.mp4")], &prompt(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert!(ledger.get("clip1.mp4").await.unwrap().unwrap().is_completed());
}

#[tokio::test]
async fn test_failed_remote_asset_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    let mut service = MockService::new();
    service
        .expect_list_existing()
        .returning(|| Ok(vec![handle("old", "clip1.mp4", AssetState::Failed)]));
    service
        .expect_delete()
        .withf(|h| h.name == "files/old")
        .times(1)
        .returning(|_| Ok(()));
    service
        .expect_upload()
        .withf(|_, name| name == "clip1.mp4")
        .times(1)
        .returning(|_, name| Ok(handle("new", name, AssetState::Pending)));
    service
        .expect_get_status()
        .returning(|h| Ok(h.clone().with_state(AssetState::Active)));
    service
        .expect_generate()
        .returning(|_, _, _| Ok(model_reply()));

    let processor = VideoProcessor::new(Arc::new(service), ledger.clone(), config.clone());
    let outcome = processor
        .process_file(&config.video_dir.join("clip1.mp4"), &prompt(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, VideoOutcome::Completed(_)));
}

#[tokio::test]
async fn test_listing_failure_falls_back_to_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    let mut service = MockService::new();
    service
        .expect_list_existing()
        .returning(|| Err(GeminiError::from_http_status(403, "permission denied")));
    service
        .expect_upload()
        .times(1)
        .returning(|_, name| Ok(handle("x", name, AssetState::Active)));
    service
        .expect_get_status()
        .returning(|h| Ok(h.clone()));
    service
        .expect_generate()
        .returning(|_, _, _| Ok(model_reply()));

    let processor = VideoProcessor::new(Arc::new(service), ledger, config.clone());
    let summary = processor
        .run(&[config.video_dir.join("clip1.mp4")], &prompt(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_unparseable_reply_is_recorded_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    let mut service = MockService::new();
    service
        .expect_list_existing()
        .returning(|| Ok(vec![handle("abc", "clip1.mp4", AssetState::Active)]));
    service
        .expect_generate()
        .returning(|_, _, _| Ok("I could not analyze this video.".to_string()));

    let processor = VideoProcessor::new(Arc::new(service), ledger.clone(), config.clone());
    processor
        .run(&[config.video_dir.join("clip1.mp4")], &prompt(), &CancellationToken::new())
        .await
        .unwrap();

    let record = ledger.get("clip1.mp4").await.unwrap().unwrap();
    assert!(record.is_failed());
    assert!(record.error.unwrap().contains("No JSON object found"));
}

#[tokio::test]
async fn test_unrecognized_extension_rejected_before_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    // No expectations: any remote call panics.
    let processor = VideoProcessor::new(Arc::new(MockService::new()), ledger.clone(), config.clone());
    let summary = processor
        .run(&[config.video_dir.join("notes.txt")], &prompt(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    let record = ledger.get("notes.txt").await.unwrap().unwrap();
    assert!(record.error.unwrap().starts_with("Invalid input"));
}

#[tokio::test]
async fn test_cancelled_run_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let processor = VideoProcessor::new(Arc::new(MockService::new()), ledger.clone(), config.clone());
    let summary = processor
        .run(
            &[config.video_dir.join("clip1.mp4"), config.video_dir.join("clip2.mp4")],
            &prompt(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(summary.not_started, 2);
    assert!(ledger.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_while_polling_records_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig {
        max_wait: Duration::from_secs(30),
        ..test_config(dir.path())
    };
    let ledger = open_ledger(&config).await;

    let mut service = MockService::new();
    service.expect_list_existing().returning(|| Ok(Vec::new()));
    service
        .expect_upload()
        .times(1)
        .returning(|_, name| Ok(handle("slow", name, AssetState::Pending)));
    service.expect_get_status().returning(|h| Ok(h.clone()));
    service.expect_generate().never();

    let processor = VideoProcessor::new(Arc::new(service), ledger.clone(), config.clone());
    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let outcome = processor
        .process_file(&config.video_dir.join("clip1.mp4"), &prompt(), &cancel)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(matches!(outcome, VideoOutcome::Failed(ref m) if m == "cancelled"));
    let record = ledger.get("clip1.mp4").await.unwrap().unwrap();
    assert_eq!(record.status, AnalysisStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("cancelled"));
    assert!(record.analysis.is_none());
}

/// Another writer completes the video while its reply is being generated.
struct CompletedElsewhere {
    inner: FakeService,
    ledger: Arc<Ledger>,
}

#[async_trait]
impl VideoService for CompletedElsewhere {
    async fn upload(&self, path: &Path, display_name: &str) -> GeminiResult<AssetHandle> {
        self.inner.upload(path, display_name).await
    }

    async fn get_status(&self, handle: &AssetHandle) -> GeminiResult<AssetHandle> {
        self.inner.get_status(handle).await
    }

    async fn list_existing(&self) -> GeminiResult<Vec<AssetHandle>> {
        self.inner.list_existing().await
    }

    async fn delete(&self, handle: &AssetHandle) -> GeminiResult<()> {
        self.inner.delete(handle).await
    }

    async fn generate(&self, prompt: &str, handle: &AssetHandle, timeout: Duration) -> GeminiResult<String> {
        self.ledger
            .upsert(&handle.display_name, AnalysisRecord::completed(sample_analysis()))
            .await
            .unwrap();
        self.inner.generate(prompt, handle, timeout).await
    }
}

#[tokio::test]
async fn test_completed_by_another_writer_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;
    let service = Arc::new(CompletedElsewhere {
        inner: FakeService::failing_for(&["clip2.mp4"]),
        ledger: ledger.clone(),
    });
    let processor = VideoProcessor::new(service, ledger.clone(), config.clone());

    let outcome = processor
        .process_file(&config.video_dir.join("clip1.mp4"), &prompt(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, VideoOutcome::Skipped));

    // The failure path hits the same completed record and must not abort the batch.
    let summary = processor
        .run(
            &[config.video_dir.join("clip2.mp4"), config.video_dir.join("clip3.mp4")],
            &prompt(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);

    let records = ledger.load().await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.values().all(|r| r.status == AnalysisStatus::Completed));
}

#[tokio::test]
async fn test_network_failure_record_never_exposes_key() {
    let secret = "AIzaSECRET_KEY_123";
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.video_dir).unwrap();
    let video = config.video_dir.join("clip1.mp4");
    std::fs::write(&video, b"fake video bytes").unwrap();
    let ledger = open_ledger(&config).await;

    // Nothing listens on port 1
    let client = GeminiClient::new(GeminiConfig::default().with_base_url("http://127.0.0.1:1"), secret).unwrap();
    let processor = VideoProcessor::new(Arc::new(client), ledger.clone(), config.clone());

    let outcome = processor
        .process_file(&video, &prompt(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, VideoOutcome::Failed(_)));

    let record = ledger.get("clip1.mp4").await.unwrap().unwrap();
    let error = record.error.unwrap();
    assert!(error.starts_with("Upload failed"), "{}", error);
    assert!(!error.contains(secret), "key leaked in: {}", error);

    let on_disk = std::fs::read_to_string(&config.ledger_path).unwrap();
    assert!(!on_disk.contains(secret));
}

#[tokio::test]
async fn test_ledger_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = open_ledger(&config).await;

    // A directory where the ledger document should be makes every read fail.
    std::fs::create_dir_all(&config.ledger_path).unwrap();

    let processor = VideoProcessor::new(Arc::new(FakeService::default()), ledger, config.clone());
    let err = processor
        .run(&[config.video_dir.join("clip1.mp4")], &prompt(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Persistence(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_concurrent_run_processes_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig {
        max_concurrent_videos: 4,
        ..test_config(dir.path())
    };
    let ledger = open_ledger(&config).await;
    let service = Arc::new(FakeService::failing_for(&["clip3.mp4"]));
    let processor = VideoProcessor::new(service, ledger.clone(), config.clone());

    let paths: Vec<PathBuf> = (0..8)
        .map(|i| config.video_dir.join(format!("clip{}.mp4", i)))
        .collect();
    let summary = processor.run(&paths, &prompt(), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 7);
    assert_eq!(summary.failed, 1);
    assert_eq!(ledger.load().await.unwrap().len(), 8);
}

// =============================================================================
// Uploader
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_activation_timeout_after_exact_poll_count() {
    let config = WorkerConfig {
        poll_interval: Duration::from_secs(5),
        max_wait: Duration::from_secs(12),
        retry: RetryConfig::none(),
        ..WorkerConfig::default()
    };

    let mut service = MockService::new();
    service
        .expect_upload()
        .times(1)
        .returning(|_, name| Ok(handle("slow", name, AssetState::Pending)));
    service
        .expect_get_status()
        .times(3)
        .returning(|h| Ok(h.clone().with_state(AssetState::Pending)));

    let uploader = AssetUploader::new(Arc::new(service), &config);
    let started = tokio::time::Instant::now();
    let err = uploader
        .upload(Path::new("videos/clip1.mp4"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UploadFailed(ref m) if m.contains("did not become active")));
    // Sleeps between polls only, none after the last one.
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_remote_failed_state_stops_polling() {
    let config = WorkerConfig {
        retry: RetryConfig::none(),
        ..WorkerConfig::default()
    };

    let mut service = MockService::new();
    service
        .expect_upload()
        .returning(|_, name| Ok(handle("bad", name, AssetState::Pending)));
    service
        .expect_get_status()
        .times(1)
        .returning(|h| Ok(h.clone().with_state(AssetState::Failed)));

    let uploader = AssetUploader::new(Arc::new(service), &config);
    let err = uploader
        .upload(Path::new("clip1.mp4"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UploadFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_polling() {
    let config = WorkerConfig {
        retry: RetryConfig::none(),
        ..WorkerConfig::default()
    };

    let mut service = MockService::new();
    service
        .expect_upload()
        .returning(|_, name| Ok(handle("slow", name, AssetState::Pending)));
    service
        .expect_get_status()
        .returning(|h| Ok(h.clone()));

    let uploader = AssetUploader::new(Arc::new(service), &config);
    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            cancel.cancel();
        })
    };

    let err = uploader.upload(Path::new("clip1.mp4"), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    canceller.await.unwrap();
}
