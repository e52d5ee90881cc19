//! Gemini client error types.

use thiserror::Error;

pub type GeminiResult<T> = Result<T, GeminiError>;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest(err)
    }
}

impl GeminiError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify a non-success HTTP response.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 => Self::NotFound(body),
            408 => Self::Timeout(body),
            429 => Self::RateLimited(body),
            500..=599 => Self::ServerError(status, body),
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Map a transport error, separating timeouts from other failures.
    ///
    /// The request URL is stripped so error text never carries query data.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err)
        }
    }

    /// Transient failures worth retrying: network trouble, timeouts, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GeminiError::Network(_)
                | GeminiError::Timeout(_)
                | GeminiError::RateLimited(_)
                | GeminiError::ServerError(_, _)
        )
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            GeminiError::NotFound(_) => Some(404),
            GeminiError::RateLimited(_) => Some(429),
            GeminiError::ServerError(status, _) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(GeminiError::from_http_status(404, "gone"), GeminiError::NotFound(_)));
        assert!(matches!(GeminiError::from_http_status(429, "slow down"), GeminiError::RateLimited(_)));
        assert!(matches!(GeminiError::from_http_status(503, "busy"), GeminiError::ServerError(503, _)));
        assert!(matches!(GeminiError::from_http_status(400, "bad"), GeminiError::RequestFailed(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(GeminiError::from_http_status(429, "").is_retryable());
        assert!(GeminiError::from_http_status(500, "").is_retryable());
        assert!(GeminiError::Timeout("deadline".into()).is_retryable());
        assert!(!GeminiError::from_http_status(400, "").is_retryable());
        assert!(!GeminiError::from_http_status(403, "").is_retryable());
        assert!(!GeminiError::invalid_response("no candidates").is_retryable());
    }

    #[test]
    fn test_http_status_getter() {
        assert_eq!(GeminiError::from_http_status(502, "").http_status(), Some(502));
        assert_eq!(GeminiError::invalid_response("x").http_status(), None);
    }
}
