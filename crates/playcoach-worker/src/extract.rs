//! JSON extraction from free-form model output.

use playcoach_models::StructuredAnalysis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No JSON object found in model response")]
    NoJsonFound,

    #[error("Malformed JSON in model response: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Model response does not match the analysis schema: {0}")]
    SchemaMismatch(#[source] serde_json::Error),
}

/// Largest `{ ... }` span: first opening brace to last closing brace.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Locate and parse the analysis object embedded in `raw`.
///
/// Surrounding prose and markdown fences are ignored. The span must decode
/// as JSON and match the [`StructuredAnalysis`] schema.
pub fn extract_analysis(raw: &str) -> Result<StructuredAnalysis, ExtractError> {
    let span = brace_span(raw).ok_or(ExtractError::NoJsonFound)?;
    let value: serde_json::Value = serde_json::from_str(span).map_err(ExtractError::MalformedJson)?;
    serde_json::from_value(value).map_err(ExtractError::SchemaMismatch)
}
