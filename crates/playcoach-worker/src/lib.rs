//! Gameplay video analysis pipeline.
//!
//! This crate provides:
//! - Prompt construction and response extraction
//! - Remote upload with activation polling
//! - The per-file orchestrator used by both the batch worker and the HTTP API
//! - Retry, cancellation, logging and metrics helpers

pub mod analyzer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod prompt;
pub mod retry;
pub mod uploader;

pub use analyzer::AnalysisInvoker;
pub use config::WorkerConfig;
pub use discovery::discover_videos;
pub use error::{PipelineError, PipelineResult};
pub use extract::{extract_analysis, ExtractError};
pub use logging::{init_tracing, VideoLogger};
pub use processor::{PipelineStage, RunSummary, VideoOutcome, VideoProcessor};
pub use prompt::build_prompt;
pub use retry::RetryConfig;
pub use uploader::AssetUploader;
