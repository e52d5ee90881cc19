//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl ModelError {
    pub fn invalid_prompt(msg: impl Into<String>) -> Self {
        Self::InvalidPrompt(msg.into())
    }

    pub fn invalid_filename(msg: impl Into<String>) -> Self {
        Self::InvalidFilename(msg.into())
    }
}
