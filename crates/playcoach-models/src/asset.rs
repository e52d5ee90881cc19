//! Remote asset handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an uploaded file on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    /// Uploaded but not yet usable for generation
    #[default]
    Pending,
    /// Ready to be referenced in a generation request
    Active,
    /// Remote processing failed; the asset is unusable
    Failed,
}

impl AssetState {
    /// Map the remote service's state string.
    ///
    /// Anything that is neither `ACTIVE` nor `FAILED` (including
    /// `PROCESSING` and `STATE_UNSPECIFIED`) is treated as pending.
    pub fn from_remote(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "ACTIVE" => AssetState::Active,
            "FAILED" => AssetState::Failed,
            _ => AssetState::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetState::Pending => "pending",
            AssetState::Active => "active",
            AssetState::Failed => "failed",
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a video stored on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHandle {
    /// Remote resource name, e.g. `files/abc123`
    pub name: String,
    /// Display name; the local filename the asset was uploaded from
    pub display_name: String,
    /// URI used to reference the asset in generation requests
    pub uri: String,
    /// MIME type the remote service recorded
    pub mime_type: String,
    pub state: AssetState,
}

impl AssetHandle {
    pub fn is_active(&self) -> bool {
        self.state == AssetState::Active
    }

    /// Copy of this handle with a refreshed state.
    pub fn with_state(mut self, state: AssetState) -> Self {
        self.state = state;
        self
    }
}
