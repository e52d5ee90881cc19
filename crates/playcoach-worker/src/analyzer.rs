//! Model invocation for an uploaded video.

use std::sync::Arc;
use std::time::Duration;

use playcoach_gemini::VideoService;
use playcoach_models::AssetHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::retry::{with_retry, RetryConfig};

/// Sends a prompt plus an asset reference to the model and returns its raw text.
pub struct AnalysisInvoker {
    service: Arc<dyn VideoService>,
    timeout: Duration,
    retry: RetryConfig,
}

impl AnalysisInvoker {
    pub fn new(service: Arc<dyn VideoService>, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            service,
            timeout,
            retry,
        }
    }

    pub async fn analyze(
        &self,
        handle: &AssetHandle,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<String> {
        info!(display_name = %handle.display_name, "Sending video for analysis");

        let text = with_retry(&self.retry, "generate", cancel, || {
            self.service.generate(prompt, handle, self.timeout)
        })
        .await
        .map_err(|e| e.into_pipeline(PipelineError::analysis))?;

        if text.trim().is_empty() {
            return Err(PipelineError::analysis_failed("model returned an empty response"));
        }
        Ok(text)
    }
}
