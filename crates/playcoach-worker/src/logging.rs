//! Structured logging for the pipeline.

use playcoach_models::StructuredAnalysis;
use tracing::{error, info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// JSON output when `LOG_FORMAT=json`, ANSI text otherwise. `RUST_LOG`
/// directives are honored on top of `default_directive`.
pub fn init_tracing(default_directive: &str) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = match default_directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Lifecycle logger for one video's pipeline.
///
/// Every event carries the `filename` field so a single video can be
/// followed through interleaved concurrent runs.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    filename: String,
}

impl VideoLogger {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn log_start(&self) {
        info!(filename = %self.filename, "Processing video");
    }

    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(filename = %self.filename, stage, "{}", message);
    }

    pub fn log_skip(&self, reason: &str) {
        info!(filename = %self.filename, "Skipping video: {}", reason);
    }

    pub fn log_failure(&self, stage: &str, message: &str) {
        error!(filename = %self.filename, stage, "Video failed: {}", message);
    }

    /// Log a completed analysis in its human-readable form.
    pub fn log_completion(&self, analysis: &StructuredAnalysis) {
        info!(
            filename = %self.filename,
            findings = analysis.finding_count(),
            "Analysis for {}:\n{}",
            self.filename,
            analysis
        );
    }

    /// Span that wraps the whole pipeline for this video.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("video", filename = %self.filename)
    }
}
