//! Remote asset upload and activation polling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use playcoach_gemini::VideoService;
use playcoach_models::{AssetHandle, AssetState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{max_polls, WorkerConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{sleep_or_cancel, with_retry, RetryConfig};

/// Remote assets keyed by display name.
pub type AssetIndex = HashMap<String, AssetHandle>;

/// Index a remote listing by display name.
///
/// When several assets share a display name the active one wins.
pub fn index_assets(handles: Vec<AssetHandle>) -> AssetIndex {
    let mut index = AssetIndex::with_capacity(handles.len());
    for handle in handles {
        if handle.display_name.is_empty() {
            continue;
        }
        match index.get(&handle.display_name) {
            Some(existing) if existing.is_active() => {}
            _ => {
                index.insert(handle.display_name.clone(), handle);
            }
        }
    }
    index
}

/// File name used as the remote display name.
pub fn display_name(path: &Path) -> PipelineResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::invalid_input(format!("{} has no file name", path.display())))
}

/// Uploads local videos and waits for them to become usable remotely.
pub struct AssetUploader {
    service: Arc<dyn VideoService>,
    poll_interval: Duration,
    max_wait: Duration,
    retry: RetryConfig,
}

impl AssetUploader {
    pub fn new(service: Arc<dyn VideoService>, config: &WorkerConfig) -> Self {
        Self {
            service,
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
            retry: config.retry.clone(),
        }
    }

    /// Upload `path` and return its handle once it is active.
    pub async fn upload(&self, path: &Path, cancel: &CancellationToken) -> PipelineResult<AssetHandle> {
        let name = display_name(path)?;
        info!(display_name = %name, "Uploading video");

        let handle = with_retry(&self.retry, "upload", cancel, || self.service.upload(path, &name))
            .await
            .map_err(|e| e.into_pipeline(PipelineError::upload))?;

        info!(display_name = %name, remote = %handle.name, "Uploaded, waiting for activation");
        self.wait_until_active(handle, cancel).await
    }

    /// Reuse a remote asset with the same display name, or upload a new one.
    ///
    /// A pending match is polled like a fresh upload. A failed match is
    /// deleted (best effort) and replaced.
    pub async fn ensure_asset(
        &self,
        path: &Path,
        existing: &AssetIndex,
        cancel: &CancellationToken,
    ) -> PipelineResult<AssetHandle> {
        let name = display_name(path)?;

        match existing.get(&name) {
            Some(handle) if handle.is_active() => {
                info!(display_name = %name, remote = %handle.name, "Video already uploaded, skipping upload");
                Ok(handle.clone())
            }
            Some(handle) if handle.state == AssetState::Pending => {
                info!(display_name = %name, remote = %handle.name, "Reusing pending upload");
                self.wait_until_active(handle.clone(), cancel).await
            }
            Some(handle) => {
                warn!(display_name = %name, remote = %handle.name, "Existing upload failed remotely, re-uploading");
                if let Err(e) =
                    with_retry(&self.retry, "delete", cancel, || self.service.delete(handle)).await
                {
                    warn!(remote = %handle.name, "Failed to delete failed upload: {}", e);
                }
                self.upload(path, cancel).await
            }
            None => self.upload(path, cancel).await,
        }
    }

    /// Poll until the asset is active.
    ///
    /// Makes at most `ceil(max_wait / poll_interval)` status checks, sleeping
    /// between them but not after the last one.
    pub async fn wait_until_active(
        &self,
        handle: AssetHandle,
        cancel: &CancellationToken,
    ) -> PipelineResult<AssetHandle> {
        let polls = max_polls(self.max_wait, self.poll_interval);

        for poll in 1..=polls {
            let current = with_retry(&self.retry, "get_status", cancel, || {
                self.service.get_status(&handle)
            })
            .await
            .map_err(|e| e.into_pipeline(PipelineError::upload))?;

            match current.state {
                AssetState::Active => {
                    info!(remote = %current.name, polls = poll, "Asset is active");
                    return Ok(current);
                }
                AssetState::Failed => {
                    return Err(PipelineError::upload_failed(format!(
                        "remote processing failed for {}",
                        current.name
                    )));
                }
                AssetState::Pending => {
                    debug!(remote = %current.name, poll, of = polls, "Asset not active yet");
                }
            }

            if poll < polls && !sleep_or_cancel(self.poll_interval, cancel).await {
                return Err(PipelineError::Cancelled);
            }
        }

        Err(PipelineError::upload_failed(format!(
            "{} did not become active within {}s",
            handle.display_name,
            self.max_wait.as_secs()
        )))
    }
}
