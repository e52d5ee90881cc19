//! Pipeline error types.

use playcoach_gemini::GeminiError;
use playcoach_ledger::LedgerError;
use playcoach_models::ModelError;
use thiserror::Error;

use crate::extract::ExtractError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Ledger error: {0}")]
    Persistence(#[from] LedgerError),

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    pub fn upload(err: GeminiError) -> Self {
        Self::UploadFailed(err.to_string())
    }

    pub fn analysis(err: GeminiError) -> Self {
        Self::AnalysisFailed(err.to_string())
    }

    /// Ledger failures abort the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Persistence(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
