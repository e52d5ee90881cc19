//! Pipeline orchestration.
//!
//! Per filename: skip if completed, reuse or upload the asset, analyze,
//! extract, persist. Stage failures are recorded in the ledger and never
//! abort other files; ledger failures abort the run.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use playcoach_gemini::VideoService;
use playcoach_ledger::{Ledger, LedgerError};
use playcoach_models::{is_allowed_video, AnalysisRecord, PromptSpec, StructuredAnalysis};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::analyzer::AnalysisInvoker;
use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::extract::extract_analysis;
use crate::logging::VideoLogger;
use crate::metrics::{record_outcome, record_stage};
use crate::prompt::build_prompt;
use crate::retry::with_retry;
use crate::uploader::{display_name, index_assets, AssetIndex, AssetUploader};

/// Per-filename pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    New,
    Uploading,
    Uploaded,
    Analyzing,
    Extracting,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Analyzing => "analyzing",
            Self::Extracting => "extracting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one file in a run.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    /// Analysis stored in the ledger
    Completed(StructuredAnalysis),
    /// A stage failed; the message is recorded in the ledger
    Failed(String),
    /// Already completed, possibly by another writer during this run
    Skipped,
    /// Cancelled before its pipeline started; nothing recorded
    NotStarted,
}

impl VideoOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
            Self::NotStarted => "not_started",
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_started: usize,
    /// Outcome per filename: skips first, then processed files in input order
    pub outcomes: Vec<(String, VideoOutcome)>,
}

impl RunSummary {
    fn push(&mut self, filename: String, outcome: VideoOutcome) {
        match &outcome {
            VideoOutcome::Completed(_) => self.completed += 1,
            VideoOutcome::Failed(_) => self.failed += 1,
            VideoOutcome::Skipped => self.skipped += 1,
            VideoOutcome::NotStarted => self.not_started += 1,
        }
        self.outcomes.push((filename, outcome));
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Runs the analysis pipeline for local video files.
pub struct VideoProcessor {
    service: Arc<dyn VideoService>,
    ledger: Arc<Ledger>,
    uploader: AssetUploader,
    invoker: AnalysisInvoker,
    config: WorkerConfig,
}

impl VideoProcessor {
    pub fn new(service: Arc<dyn VideoService>, ledger: Arc<Ledger>, config: WorkerConfig) -> Self {
        let uploader = AssetUploader::new(Arc::clone(&service), &config);
        let invoker = AnalysisInvoker::new(
            Arc::clone(&service),
            config.analysis_timeout,
            config.retry.clone(),
        );

        Self {
            service,
            ledger,
            uploader,
            invoker,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Prompt parameters from the configured game and focus.
    pub fn default_prompt(&self) -> PipelineResult<PromptSpec> {
        Ok(PromptSpec::new(
            self.config.game_name.clone(),
            self.config.focus_on.clone(),
        )?)
    }

    /// Run the pipeline for a single file.
    pub async fn process_file(
        &self,
        path: &Path,
        prompt: &PromptSpec,
        cancel: &CancellationToken,
    ) -> PipelineResult<VideoOutcome> {
        let filename = display_name(path)?;
        if self.is_completed(&filename).await? {
            return Ok(self.skip(&filename));
        }
        if let Some(rejected) = self.reject_unrecognized(&filename).await? {
            return Ok(rejected);
        }

        let assets = self.fetch_existing(cancel).await;
        self.process_one(path, &filename, prompt, &assets, cancel).await
    }

    /// Run the pipeline for a batch of files.
    ///
    /// Paths are deduplicated by filename. Completed files are skipped before
    /// the remote listing is fetched, so a fully processed batch makes no
    /// remote calls. Returns `Err` only for ledger failures.
    pub async fn run(
        &self,
        paths: &[PathBuf],
        prompt: &PromptSpec,
        cancel: &CancellationToken,
    ) -> PipelineResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for path in paths {
            let filename = match display_name(path) {
                Ok(name) => name,
                Err(e) => {
                    warn!(path = %path.display(), "Ignoring path: {}", e);
                    continue;
                }
            };
            if !seen.insert(filename.clone()) {
                continue;
            }
            if self.is_completed(&filename).await? {
                summary.push(filename.clone(), self.skip(&filename));
                continue;
            }
            if let Some(rejected) = self.reject_unrecognized(&filename).await? {
                summary.push(filename, rejected);
                continue;
            }
            pending.push((path.clone(), filename));
        }

        if pending.is_empty() {
            info!(skipped = summary.skipped, "No new videos to analyze");
            return Ok(summary);
        }

        info!(count = pending.len(), "Processing new videos");
        let assets = self.fetch_existing(cancel).await;
        let semaphore = Semaphore::new(self.config.max_concurrent_videos.max(1));

        let results = try_join_all(pending.iter().map(|(path, filename)| {
            let semaphore = &semaphore;
            let assets = &assets;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| PipelineError::Cancelled)?;
                let outcome = self.process_one(path, filename, prompt, assets, cancel).await?;
                Ok::<_, PipelineError>((filename.clone(), outcome))
            }
        }))
        .await?;

        for (filename, outcome) in results {
            summary.push(filename, outcome);
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            not_started = summary.not_started,
            "Run finished"
        );
        Ok(summary)
    }

    async fn is_completed(&self, filename: &str) -> PipelineResult<bool> {
        Ok(self
            .ledger
            .get(filename)
            .await?
            .is_some_and(|r| r.is_completed()))
    }

    /// Write a terminal record. Returns `false` when another writer already
    /// completed this filename, which leaves the video skipped.
    async fn store(&self, filename: &str, record: AnalysisRecord) -> PipelineResult<bool> {
        match self.ledger.upsert(filename, record).await {
            Ok(()) => Ok(true),
            Err(LedgerError::Immutable(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn skip(&self, filename: &str) -> VideoOutcome {
        VideoLogger::new(filename).log_skip("already processed");
        record_outcome("skipped");
        VideoOutcome::Skipped
    }

    /// Record a failure for files without a video extension, before any remote call.
    async fn reject_unrecognized(&self, filename: &str) -> PipelineResult<Option<VideoOutcome>> {
        if is_allowed_video(filename) {
            return Ok(None);
        }

        let message = PipelineError::invalid_input(format!(
            "{} is not a recognized video file",
            filename
        ))
        .to_string();
        VideoLogger::new(filename).log_failure(PipelineStage::New.as_str(), &message);
        self.ledger
            .upsert(filename, AnalysisRecord::failed(message.clone()))
            .await?;
        record_outcome("failed");
        Ok(Some(VideoOutcome::Failed(message)))
    }

    /// Remote assets by display name. A failed listing degrades to empty.
    async fn fetch_existing(&self, cancel: &CancellationToken) -> AssetIndex {
        match with_retry(&self.config.retry, "list_existing", cancel, || {
            self.service.list_existing()
        })
        .await
        {
            Ok(handles) => index_assets(handles),
            Err(e) => {
                warn!("Error retrieving uploaded files, assuming none: {}", e);
                AssetIndex::new()
            }
        }
    }

    async fn process_one(
        &self,
        path: &Path,
        filename: &str,
        prompt: &PromptSpec,
        assets: &AssetIndex,
        cancel: &CancellationToken,
    ) -> PipelineResult<VideoOutcome> {
        let logger = VideoLogger::new(filename);

        if cancel.is_cancelled() {
            logger.log_skip("run cancelled before start");
            record_outcome("not_started");
            return Ok(VideoOutcome::NotStarted);
        }

        let span = logger.create_span();
        async {
            logger.log_start();
            let mut stage = PipelineStage::New;

            match self.run_stages(path, prompt, assets, cancel, &logger, &mut stage).await {
                Ok(analysis) => {
                    if !self
                        .store(filename, AnalysisRecord::completed(analysis.clone()))
                        .await?
                    {
                        return Ok(self.skip(filename));
                    }
                    logger.log_stage(PipelineStage::Completed.as_str(), "Analysis stored");
                    logger.log_completion(&analysis);
                    record_outcome("completed");
                    Ok(VideoOutcome::Completed(analysis))
                }
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    let message = e.to_string();
                    logger.log_failure(stage.as_str(), &message);
                    if !self
                        .store(filename, AnalysisRecord::failed(message.clone()))
                        .await?
                    {
                        return Ok(self.skip(filename));
                    }
                    record_outcome("failed");
                    Ok(VideoOutcome::Failed(message))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        path: &Path,
        prompt: &PromptSpec,
        assets: &AssetIndex,
        cancel: &CancellationToken,
        logger: &VideoLogger,
        stage: &mut PipelineStage,
    ) -> PipelineResult<StructuredAnalysis> {
        *stage = PipelineStage::Uploading;
        let started = Instant::now();
        let handle = self.uploader.ensure_asset(path, assets, cancel).await?;
        record_stage(PipelineStage::Uploading.as_str(), started.elapsed());
        *stage = PipelineStage::Uploaded;
        logger.log_stage(stage.as_str(), &format!("Remote asset {} ready", handle.name));

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        *stage = PipelineStage::Analyzing;
        let started = Instant::now();
        let raw = self.invoker.analyze(&handle, &build_prompt(prompt), cancel).await?;
        record_stage(PipelineStage::Analyzing.as_str(), started.elapsed());

        *stage = PipelineStage::Extracting;
        let started = Instant::now();
        let analysis = extract_analysis(&raw)?;
        record_stage(PipelineStage::Extracting.as_str(), started.elapsed());

        Ok(analysis)
    }
}
