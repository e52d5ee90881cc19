//! Video upload and analysis lookup handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use playcoach_models::{
    is_allowed_video, sanitize_filename, video_mime_type, AnalysisRecord, AnalysisStatus,
    PromptSpec,
};
use playcoach_worker::VideoProcessor;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_upload;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct VideoSummary {
    pub filename: String,
    pub status: AnalysisStatus,
    pub analysis: AnalysisRecord,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoSummary>,
}

/// Parts of an upload form.
#[derive(Default)]
struct UploadForm {
    video: Option<(String, Bytes)>,
    game: Option<String>,
    focus: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            match field.name() {
                Some("video") => {
                    let name = field.file_name().unwrap_or_default().to_string();
                    form.video = Some((name, field.bytes().await?));
                }
                Some("game") => form.game = Some(field.text().await?),
                Some("focus") => form.focus = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }
}

/// Accept a video, record it as pending and analyze it in the background.
pub async fn upload_video(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let api_key = state
        .sessions
        .key_for(&jar)
        .await?
        .ok_or_else(|| ApiError::unauthorized("API key not configured"))?;

    let form = UploadForm::read(multipart).await?;
    let (client_name, bytes) = form
        .video
        .ok_or_else(|| ApiError::bad_request("No video file provided"))?;
    if client_name.trim().is_empty() {
        return Err(ApiError::bad_request("No selected file"));
    }

    let filename = sanitize_filename(&client_name)?;
    if !is_allowed_video(&filename) {
        record_upload("rejected");
        return Err(ApiError::bad_request("Invalid file type"));
    }

    let game = form
        .game
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(|| state.config.worker.game_name.clone());
    let prompt = PromptSpec::new(game, form.focus)?;

    let guard = state.in_flight.try_claim(&filename).ok_or_else(|| {
        ApiError::conflict(format!("{} is already being analyzed", filename))
    })?;
    if state
        .ledger
        .get(&filename)
        .await?
        .is_some_and(|r| r.is_completed())
    {
        return Err(ApiError::conflict(format!("{} has already been analyzed", filename)));
    }

    let service = state
        .services
        .create(&api_key)
        .map_err(|e| ApiError::internal(format!("Failed to create Gemini client: {}", e)))?;

    let path = state.config.upload_folder.join(&filename);
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        error!(filename = %filename, "Error saving file: {}", e);
        return Err(ApiError::internal("Error saving file"));
    }
    state.ledger.upsert(&filename, AnalysisRecord::pending()).await?;
    record_upload("accepted");
    info!(filename = %filename, size = bytes.len(), "Video uploaded");

    let processor = VideoProcessor::new(service, Arc::clone(&state.ledger), state.config.worker.clone());
    let cancel = state.shutdown.child_token();
    let background_name = filename.clone();
    tokio::spawn(async move {
        let _guard = guard;
        match processor.process_file(&path, &prompt, &cancel).await {
            Ok(outcome) => info!(
                filename = %background_name,
                outcome = outcome.label(),
                "Background analysis finished"
            ),
            Err(e) => error!(filename = %background_name, "Background analysis aborted: {}", e),
        }
    });

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename,
    }))
}

/// List every ledger entry.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<VideoListResponse>> {
    let videos = state
        .ledger
        .list()
        .await?
        .into_iter()
        .map(|(filename, record)| VideoSummary {
            filename,
            status: record.status,
            analysis: record,
        })
        .collect();

    Ok(Json(VideoListResponse { videos }))
}

/// Serve an uploaded video's bytes.
pub async fn get_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if sanitize_filename(&filename).ok().as_deref() != Some(filename.as_str()) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = state.config.upload_folder.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Video not found"));
        }
        Err(e) => {
            warn!(filename = %filename, "Failed to read video: {}", e);
            return Err(ApiError::internal("Failed to read video"));
        }
    };

    Ok(([(header::CONTENT_TYPE, video_mime_type(&filename))], bytes))
}

/// Ledger record for one video, including failures.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<AnalysisRecord>> {
    state
        .ledger
        .get(&filename)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Video not found"))
}
