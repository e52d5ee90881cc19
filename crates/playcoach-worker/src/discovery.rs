//! Input video discovery.

use std::path::{Path, PathBuf};

use playcoach_models::is_allowed_video;
use tracing::error;

use crate::error::PipelineResult;

/// List recognized video files directly inside `dir`, sorted by name.
///
/// A missing directory is logged and yields an empty list.
pub async fn discover_videos(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(dir = %dir.display(), "Video directory not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let allowed = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_allowed_video);
        if allowed {
            videos.push(path);
        }
    }

    videos.sort();
    Ok(videos)
}
