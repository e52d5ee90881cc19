//! Remote video-understanding service boundary.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use playcoach_models::AssetHandle;

use crate::error::GeminiResult;

/// Operations the pipeline consumes from the remote service.
///
/// Implementations perform a single attempt per call; retry and polling
/// policy belongs to the caller.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Upload a local file under the given display name.
    async fn upload(&self, path: &Path, display_name: &str) -> GeminiResult<AssetHandle>;

    /// Fetch the current state of an uploaded asset.
    async fn get_status(&self, handle: &AssetHandle) -> GeminiResult<AssetHandle>;

    /// List every asset currently stored remotely.
    async fn list_existing(&self) -> GeminiResult<Vec<AssetHandle>>;

    /// Delete an asset.
    async fn delete(&self, handle: &AssetHandle) -> GeminiResult<()>;

    /// Run the model over the asset with the given prompt and return its text.
    async fn generate(
        &self,
        prompt: &str,
        handle: &AssetHandle,
        timeout: Duration,
    ) -> GeminiResult<String>;
}
