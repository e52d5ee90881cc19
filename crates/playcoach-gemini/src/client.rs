//! Gemini HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use playcoach_models::{video_mime_type, AssetHandle};
use reqwest::{Body, Client, Response};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{GeminiError, GeminiResult};
use crate::service::VideoService;
use crate::types::{
    FileResource, GenerateRequest, GenerateResponse, ListFilesResponse, UploadMetadata,
    UploadResponse, UploadStartRequest,
};

const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
/// Credential header; keeps the key out of URLs and therefore out of error text.
const API_KEY_HEADER: &str = "x-goog-api-key";
const LIST_PAGE_SIZE: &str = "100";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Model used for generateContent
    pub model: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GEMINI_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            connect_timeout: std::env::var("GEMINI_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Client for the Gemini File API and generateContent.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a client bound to one API key.
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> GeminiResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(GeminiError::Network)?;

        Ok(Self {
            http,
            config,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn check(response: Response) -> GeminiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GeminiError::from_http_status(status.as_u16(), body))
    }

    async fn start_upload(&self, display_name: &str, mime_type: &str, len: u64) -> GeminiResult<String> {
        let response = self
            .http
            .post(self.url("upload/v1beta/files"))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await
            .map_err(GeminiError::from_reqwest)?;

        let response = Self::check(response).await?;
        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GeminiError::invalid_response("upload start returned no upload URL"))
    }
}

#[async_trait]
impl VideoService for GeminiClient {
    async fn upload(&self, path: &Path, display_name: &str) -> GeminiResult<AssetHandle> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        let mime_type = video_mime_type(display_name);

        debug!(display_name, len, mime_type, "Starting resumable upload");
        let upload_url = self.start_upload(display_name, mime_type, len).await?;

        let response = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(reqwest::header::CONTENT_LENGTH, len.to_string())
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(GeminiError::from_reqwest)?;

        let uploaded: UploadResponse = Self::check(response).await?.json().await?;
        let handle = AssetHandle::from(uploaded.file);
        info!(name = %handle.name, display_name, state = %handle.state, "Uploaded video");
        Ok(handle)
    }

    async fn get_status(&self, handle: &AssetHandle) -> GeminiResult<AssetHandle> {
        let response = self
            .http
            .get(self.url(&format!("v1beta/{}", handle.name)))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(GeminiError::from_reqwest)?;

        let file: FileResource = Self::check(response).await?.json().await?;
        Ok(AssetHandle::from(file))
    }

    async fn list_existing(&self) -> GeminiResult<Vec<AssetHandle>> {
        let mut handles = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.url("v1beta/files"))
                .header(API_KEY_HEADER, self.api_key.as_str())
                .query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(GeminiError::from_reqwest)?;
            let page: ListFilesResponse = Self::check(response).await?.json().await?;
            handles.extend(page.files.into_iter().map(AssetHandle::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = handles.len(), "Listed remote files");
        Ok(handles)
    }

    async fn delete(&self, handle: &AssetHandle) -> GeminiResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("v1beta/{}", handle.name)))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(GeminiError::from_reqwest)?;

        Self::check(response).await?;
        info!(name = %handle.name, "Deleted remote file");
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        handle: &AssetHandle,
        timeout: Duration,
    ) -> GeminiResult<String> {
        let url = self.url(&format!("v1beta/models/{}:generateContent", self.config.model));

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .timeout(timeout)
            .json(&GenerateRequest::for_video(prompt, handle))
            .send()
            .await
            .map_err(GeminiError::from_reqwest)?;

        let body: GenerateResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(GeminiError::from_reqwest)?;

        body.first_text()
            .ok_or_else(|| GeminiError::invalid_response("no candidates in generateContent response"))
    }
}
