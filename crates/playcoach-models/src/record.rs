//! Ledger record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::StructuredAnalysis;

/// Processing status of a video in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Accepted for processing, no outcome yet
    #[default]
    Pending,
    /// Analysis extracted and stored
    Completed,
    /// A pipeline stage failed; the error is recorded
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the status is a pipeline outcome (completed or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger entry for one video, keyed by filename.
///
/// A completed record is final. Failed and pending records are replaced when
/// the pipeline runs again for the same filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub status: AnalysisStatus,

    /// The extracted critique (completed records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<StructuredAnalysis>,

    /// Failure reason (failed records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the record was last written
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Marker written when a video is accepted but not yet processed.
    pub fn pending() -> Self {
        Self {
            status: AnalysisStatus::Pending,
            analysis: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn completed(analysis: StructuredAnalysis) -> Self {
        Self {
            status: AnalysisStatus::Completed,
            analysis: Some(analysis),
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            analysis: None,
            error: Some(error.into()),
            updated_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == AnalysisStatus::Failed
    }
}
