//! Gemini wire types.

use playcoach_models::{AssetHandle, AssetState};
use serde::{Deserialize, Serialize};

/// File resource as returned by the File API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl From<FileResource> for AssetHandle {
    fn from(file: FileResource) -> Self {
        AssetHandle {
            state: file
                .state
                .as_deref()
                .map(AssetState::from_remote)
                .unwrap_or_default(),
            display_name: file.display_name.unwrap_or_default(),
            uri: file.uri.unwrap_or_default(),
            mime_type: file.mime_type.unwrap_or_default(),
            name: file.name,
        }
    }
}

/// Envelope returned by the upload finalize request.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub file: FileResource,
}

/// Metadata sent with the resumable upload start request.
#[derive(Debug, Serialize)]
pub struct UploadStartRequest<'a> {
    pub file: UploadMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct UploadMetadata<'a> {
    pub display_name: &'a str,
}

/// One page of the file listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    #[serde(default)]
    pub files: Vec<FileResource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// generateContent request body.
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Serialize)]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

impl GenerateRequest {
    /// Single-turn request pairing a prompt with an uploaded video.
    pub fn for_video(prompt: &str, handle: &AssetHandle) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: handle.mime_type.clone(),
                            file_uri: handle.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        }
    }
}

/// generateContent response.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
